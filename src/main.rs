//! uiflow - declarative UI-scenario runner
//!
//! Drives a browser over WebDriver through YAML scenarios and reports
//! pass/fail per scenario.

use clap::Parser;
use uiflow::commands::Commands;
use uiflow::common::logging;
use uiflow::{cli, Error};

#[derive(Parser)]
#[command(name = "uiflow", about = "Declarative UI-scenario runner over WebDriver")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    let log_guard = logging::init_cli(verbose);
    if let Some(path) = &log_guard.log_file {
        tracing::debug!("Run log: {}", path.display());
    }

    let code = match cli::dispatch(cli.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Error::BrowserUnreachable { .. } = e {
                eprintln!("Hint: start a driver first, e.g. 'chromedriver --port=4444'");
            }
            1
        }
    };

    // Flush the run log before exiting
    drop(log_guard);
    std::process::exit(code);
}
