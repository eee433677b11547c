//! WebDriver client
//!
//! Speaks the W3C WebDriver HTTP protocol to chromedriver, geckodriver or a
//! Selenium server. One client owns exactly one browser session.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::common::config::Config;
use crate::common::{truncate_for_display, Error, Result};

use super::types::*;
use super::{Browser, ElementRef, Locator};

/// Script forcing an element visible, for controls only revealed on hover
const SHOW_SCRIPT: &str = "const el = arguments[0];\
     if (getComputedStyle(el).display === 'none') { el.style.display = 'block'; }\
     el.style.visibility = 'visible';";

/// WebDriver session backed by a remote browser
pub struct WebDriverClient {
    http: reqwest::Client,
    /// Server root, without trailing slash
    base: String,
    session_id: String,
    closed: bool,
}

impl WebDriverClient {
    /// Start a new browser session on the configured WebDriver server
    pub async fn connect(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()?;
        let base = config.webdriver.url.trim_end_matches('/').to_string();

        let body = new_session_body(&config.webdriver, config.timeouts.page_load_ms);
        tracing::debug!("WebDriver new session: {}", body);

        let response = http
            .post(format!("{}/session", base))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::BrowserUnreachable {
                url: base.clone(),
                reason: e.to_string(),
            })?;

        let value = Self::unwrap_response(response).await?;
        let session: NewSessionValue = serde_json::from_value(value).map_err(|e| {
            Error::WebDriverProtocol(format!("Invalid new session response: {}", e))
        })?;

        tracing::info!(
            session = %session.session_id,
            browser = %config.webdriver.browser.capability_name(),
            "Browser session started"
        );
        tracing::trace!("Negotiated capabilities: {}", session.capabilities);

        Ok(Self {
            http,
            base,
            session_id: session.session_id,
            closed: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Turn an HTTP response into its `value` payload or a typed error
    async fn unwrap_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        tracing::trace!("WebDriver <<< {} {}", status, truncate_for_display(&text, 2000));

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            Error::WebDriverProtocol(format!(
                "Non-JSON response (HTTP {}): {} ({})",
                status,
                truncate_for_display(&text, 200),
                e
            ))
        })?;

        if status.is_success() {
            return Ok(envelope.value);
        }

        match serde_json::from_value::<ErrorValue>(envelope.value) {
            Ok(err) => Err(Error::webdriver(&err.error, &err.message)),
            Err(_) => Err(Error::WebDriverProtocol(format!(
                "HTTP {} without error payload",
                status
            ))),
        }
    }

    /// Send a session-scoped command
    async fn command<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        tracing::debug!("WebDriver >>> {} {}", method, path);

        let mut request = self.http.request(method.clone(), &url);
        request = match body {
            Some(b) => request.json(b),
            // POST endpoints without parameters still require an empty object
            None if method == Method::POST => request.json(&json!({})),
            None => request,
        };

        let response = request.send().await?;
        Self::unwrap_response(response).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.command::<Value>(Method::GET, path, None).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn post_empty(&self, path: &str) -> Result<Value> {
        self.command::<Value>(Method::POST, path, None).await
    }

    /// Run a synchronous script in the page
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", &ScriptRequest { script, args })
            .await
    }
}

#[async_trait]
impl Browser for WebDriverClient {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::info!("Navigating to {}", url);
        self.post("/url", &json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let value = self.get("/url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::WebDriverProtocol(format!("Expected URL string, got {}", value)))
    }

    async fn find_all(
        &mut self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>> {
        let (using, value) = locator.to_strategy();
        let path = match scope {
            Some(el) => format!("/element/{}/elements", el.id()),
            None => "/elements".to_string(),
        };

        let result = match self.post(&path, &FindRequest { using, value: &value }).await {
            Ok(v) => v,
            // Some drivers answer an empty find with 404 instead of []
            Err(Error::WebDriver { error, .. }) if error == "no such element" => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };

        let items = result.as_array().ok_or_else(|| {
            Error::WebDriverProtocol(format!("Expected element list, got {}", result))
        })?;

        items
            .iter()
            .map(|item| {
                element_id(item).map(ElementRef::new).ok_or_else(|| {
                    Error::WebDriverProtocol(format!("Malformed element reference: {}", item))
                })
            })
            .collect()
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.post_empty(&format!("/element/{}/click", element.id()))
            .await?;
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementRef, keys: &str) -> Result<()> {
        self.post(
            &format!("/element/{}/value", element.id()),
            &SendKeysRequest { text: keys },
        )
        .await?;
        Ok(())
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<()> {
        self.post_empty(&format!("/element/{}/clear", element.id()))
            .await?;
        Ok(())
    }

    async fn show(&mut self, element: &ElementRef) -> Result<()> {
        self.execute(SHOW_SCRIPT, vec![element_arg(element.id())])
            .await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let value = self.get("/screenshot").await?;
        let encoded = value.as_str().ok_or_else(|| {
            Error::WebDriverProtocol("Screenshot response is not a string".to_string())
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::WebDriverProtocol(format!("Invalid screenshot data: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let url = format!("{}/session/{}", self.base, self.session_id);
        let response = self.http.delete(&url).send().await?;
        if response.status() != StatusCode::NOT_FOUND {
            Self::unwrap_response(response).await?;
        }
        tracing::info!(session = %self.session_id, "Browser session closed");
        Ok(())
    }
}
