//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// WebDriver endpoint and browser settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Report and artifact settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Browser launched by the WebDriver endpoint
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    /// Chrome / Chromium via chromedriver
    #[default]
    Chrome,
    /// Firefox via geckodriver
    Firefox,
}

impl BrowserKind {
    /// W3C `browserName` capability value
    pub fn capability_name(self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = super::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            other => Err(super::Error::Config(format!(
                "Unknown browser '{}'. Supported: chrome, firefox",
                other
            ))),
        }
    }
}

/// Application under test
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Base URL that relative `navigate` steps are joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11011".to_string()
}

/// WebDriver settings
#[derive(Debug, Deserialize)]
pub struct WebDriverConfig {
    /// WebDriver server URL (chromedriver, geckodriver or Selenium)
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Browser to request
    #[serde(default)]
    pub browser: BrowserKind,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Browser window width in pixels
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Browser window height in pixels
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: BrowserKind::default(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    900
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// How long locate and assert steps poll before failing
    #[serde(default = "default_command")]
    pub default_command_ms: u64,

    /// Delay between polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Page load timeout handed to the browser
    #[serde(default = "default_page_load")]
    pub page_load_ms: u64,

    /// Timeout for individual WebDriver HTTP requests
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_command_ms: default_command(),
            poll_interval_ms: default_poll_interval(),
            page_load_ms: default_page_load(),
            request_secs: default_request(),
        }
    }
}

impl Timeouts {
    pub fn default_command(&self) -> Duration {
        Duration::from_millis(self.default_command_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_command() -> u64 {
    4000
}
fn default_poll_interval() -> u64 {
    100
}
fn default_page_load() -> u64 {
    60_000
}
fn default_request() -> u64 {
    60
}

/// Report and artifact settings
#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    /// Directory for failure screenshots; none are taken when unset
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::from_toml(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.timeouts.poll_interval_ms == 0 {
            return Err(super::Error::ConfigParse(
                "timeouts.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
