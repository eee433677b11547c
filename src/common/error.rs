//! Error types for uiflow
//!
//! Messages name the selector, step or endpoint involved so a failed run can
//! be diagnosed from the terminal output alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for uiflow
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Scenario Errors ===
    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(String),

    #[error("Invalid scenario: {0}")]
    ScenarioInvalid(String),

    #[error("Undefined variable '${{{0}}}'. Declare it under 'vars'")]
    UndefinedVariable(String),

    #[error("Unknown special key '{{{0}}}'")]
    UnknownKey(String),

    #[error("Unknown built-in scenario '{name}'. Available: {available}")]
    UnknownBuiltin { name: String, available: String },

    // === Browser Errors ===
    #[error("WebDriver not reachable at {url}: {reason}. Is chromedriver/geckodriver running?")]
    BrowserUnreachable { url: String, reason: String },

    #[error("WebDriver error '{error}': {message}")]
    WebDriver { error: String, message: String },

    #[error("WebDriver protocol error: {0}")]
    WebDriverProtocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Step Errors ===
    #[error("Step {step} failed: {detail}")]
    StepFailure { step: usize, detail: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a WebDriver error from the `error`/`message` pair of a response
    pub fn webdriver(error: &str, message: &str) -> Self {
        Self::WebDriver {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a step failure error
    pub fn step_failure(step: usize, detail: impl Into<String>) -> Self {
        Self::StepFailure {
            step,
            detail: detail.into(),
        }
    }

    /// Whether a driver error is worth re-resolving the element and retrying
    ///
    /// These come from the page re-rendering between lookup and interaction,
    /// or from an overlay that has not finished animating away.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::WebDriver { error, .. }
                if error == "stale element reference"
                    || error == "element not interactable"
                    || error == "element click intercepted"
        )
    }
}
