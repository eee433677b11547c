//! Browser automation capability
//!
//! The scenario executor only talks to the [`Browser`] trait. The shipped
//! implementation is a W3C WebDriver client; tests plug in simulated pages.

mod client;
pub mod keys;
pub mod types;

pub use client::WebDriverClient;

use async_trait::async_trait;

use crate::common::Result;

/// Opaque handle to an element in the live page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// How to find elements relative to a scope (or the document)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector, matched against descendants of the scope
    Css(String),
    /// Elements at or below the scope owning a text node containing the text
    ContainsText(String),
    /// Parent element of the scope
    Parent,
}

impl Locator {
    /// Translate to a W3C `(using, value)` location strategy pair
    pub fn to_strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(css) => ("css selector", css.clone()),
            Locator::ContainsText(text) => (
                "xpath",
                format!(
                    "descendant-or-self::*[not(self::script or self::style or self::title)]\
                     [text()[contains(., {})]]",
                    xpath_literal(text)
                ),
            ),
            Locator::Parent => ("xpath", "..".to_string()),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "get '{}'", css),
            Locator::ContainsText(text) => write!(f, "contains '{}'", text),
            Locator::Parent => write!(f, "parent"),
        }
    }
}

/// Quote a string as an XPath 1.0 literal
///
/// XPath 1.0 has no escape sequences, so text holding both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }

    let parts: Vec<String> = s
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Primitives the scenario executor needs from a browser session
///
/// None of these poll: lookups return whatever the page holds right now,
/// and the executor owns retry and timeout policy.
#[async_trait]
pub trait Browser: Send {
    /// Load a URL in the current tab
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current location of the page
    async fn current_url(&mut self) -> Result<String>;

    /// Find elements; an empty vector when nothing matches
    async fn find_all(
        &mut self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>>;

    /// Click an element
    async fn click(&mut self, element: &ElementRef) -> Result<()>;

    /// Type into an element; `keys` may hold WebDriver key code points
    async fn send_keys(&mut self, element: &ElementRef, keys: &str) -> Result<()>;

    /// Clear an editable element
    async fn clear(&mut self, element: &ElementRef) -> Result<()>;

    /// Force a hidden element to be displayed
    async fn show(&mut self, element: &ElementRef) -> Result<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// End the browser session
    async fn close(&mut self) -> Result<()>;
}
