//! uiflow - declarative UI-scenario runner
//!
//! Runs YAML-described user workflows (navigate, locate, interact, assert)
//! against a live web application through a W3C WebDriver browser session.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::{Browser, ElementRef, Locator};
pub use scenario::{run_scenario, RunOptions, Scenario, ScenarioResult};
