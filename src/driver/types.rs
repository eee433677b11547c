//! W3C WebDriver message types
//!
//! See: https://www.w3.org/TR/webdriver2/

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::config::{BrowserKind, WebDriverConfig};

/// JSON key identifying a web element reference
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ca9b5856ada";

/// Every WebDriver response body wraps its payload in `value`
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub value: Value,
}

/// Error payload carried in `value` for non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Payload of a successful New Session response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionValue {
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Find Element(s) request body
#[derive(Debug, Serialize)]
pub struct FindRequest<'a> {
    pub using: &'a str,
    pub value: &'a str,
}

/// Execute Script request body
#[derive(Debug, Serialize)]
pub struct ScriptRequest<'a> {
    pub script: &'a str,
    pub args: Vec<Value>,
}

/// Element Send Keys request body
#[derive(Debug, Serialize)]
pub struct SendKeysRequest<'a> {
    pub text: &'a str,
}

/// Extract the element id from a web element reference object
pub fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Serialize an element id as a script argument
pub fn element_arg(id: &str) -> Value {
    json!({ ELEMENT_KEY: id })
}

/// Build the New Session request body
pub fn new_session_body(config: &WebDriverConfig, page_load_ms: u64) -> Value {
    let size = format!("{},{}", config.window_width, config.window_height);
    let mut always_match = json!({
        "browserName": config.browser.capability_name(),
        "timeouts": { "pageLoad": page_load_ms },
    });

    match config.browser {
        BrowserKind::Chrome => {
            let mut args = vec![format!("--window-size={}", size)];
            if config.headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
            }
            always_match["goog:chromeOptions"] = json!({ "args": args });
        }
        BrowserKind::Firefox => {
            let mut args = vec![
                format!("--width={}", config.window_width),
                format!("--height={}", config.window_height),
            ];
            if config.headless {
                args.push("-headless".to_string());
            }
            always_match["moz:firefoxOptions"] = json!({ "args": args });
        }
    }

    json!({ "capabilities": { "alwaysMatch": always_match } })
}
