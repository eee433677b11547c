//! CLI command definitions
//!
//! Defines the clap commands for the uiflow CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more scenarios against a live application
    Run {
        /// Paths to YAML scenario files
        paths: Vec<PathBuf>,

        /// Run an embedded scenario (e.g. pipeline-lifecycle)
        #[arg(long)]
        builtin: Option<String>,

        /// Base URL of the application under test
        #[arg(long)]
        base_url: Option<String>,

        /// WebDriver server URL
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Browser to drive (chrome, firefox)
        #[arg(long)]
        browser: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Default polling window for locate and assert steps, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Save a screenshot here when a step fails
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse and validate scenario files without starting a browser
    Validate {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print an embedded scenario as YAML
    Show {
        /// Scenario name; lists the embedded scenarios when omitted
        name: Option<String>,
    },

    /// View the run log
    Logs {
        /// Number of lines to show (default: 50)
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,

        /// Clear the log file
        #[arg(long)]
        clear: bool,
    },
}
