//! CLI command handling
//!
//! Loads configuration and scenarios, drives the executor and formats output.

use std::future::Future;
use std::path::PathBuf;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, paths, Error, Result};
use crate::driver::{Browser, WebDriverClient};
use crate::scenario::{self, RunOptions, Scenario, ScenarioResult};

/// Flags of the `run` command that override configuration values
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub base_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub browser: Option<String>,
    pub headed: bool,
    pub timeout_ms: Option<u64>,
    pub screenshot_dir: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

/// Dispatch a CLI command; returns `false` when a scenario failed
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            paths,
            builtin,
            base_url,
            webdriver_url,
            browser,
            headed,
            timeout_ms,
            screenshot_dir,
            json,
            verbose,
        } => {
            let overrides = RunOverrides {
                base_url,
                webdriver_url,
                browser,
                headed,
                timeout_ms,
                screenshot_dir,
                json,
                verbose,
            };
            run(paths, builtin, overrides).await
        }

        Commands::Validate { paths } => validate(&paths),

        Commands::Show { name } => {
            match name {
                Some(name) => print!("{}", scenario::builtin_source(&name)?),
                None => {
                    for name in scenario::builtin_names() {
                        println!("{}", name);
                    }
                }
            }
            Ok(true)
        }

        Commands::Logs { lines, clear } => {
            show_logs(lines, clear)?;
            Ok(true)
        }
    }
}

/// Load every requested scenario up front so a typo fails before any browser starts
fn load_scenarios(paths: &[PathBuf], builtin: Option<&str>) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    if let Some(name) = builtin {
        scenarios.push(scenario::builtin(name)?);
    }
    for path in paths {
        let loaded = Scenario::load(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;
        scenarios.push(loaded);
    }
    if scenarios.is_empty() {
        return Err(Error::Config(
            "No scenarios given. Pass scenario files or --builtin <name>".to_string(),
        ));
    }
    Ok(scenarios)
}

/// Merge configuration file values with command-line flags
pub fn apply_overrides(config: &mut Config, overrides: &RunOverrides) -> Result<()> {
    if let Some(url) = &overrides.webdriver_url {
        config.webdriver.url = url.clone();
    }
    if let Some(browser) = &overrides.browser {
        config.webdriver.browser = browser.parse()?;
    }
    if overrides.headed {
        config.webdriver.headless = false;
    }
    if let Some(ms) = overrides.timeout_ms {
        config.timeouts.default_command_ms = ms;
    }
    if let Some(dir) = &overrides.screenshot_dir {
        config.output.screenshot_dir = Some(dir.clone());
    }
    Ok(())
}

/// Run options for one scenario
///
/// The base URL comes from the command line, then the scenario, then the
/// configuration file.
pub fn run_options(config: &Config, scenario: &Scenario, overrides: &RunOverrides) -> RunOptions {
    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| scenario.base_url.clone())
        .unwrap_or_else(|| config.target.base_url.clone());

    RunOptions {
        base_url,
        default_timeout: config.timeouts.default_command(),
        poll_interval: config.timeouts.poll_interval(),
        screenshot_dir: config.output.screenshot_dir.clone(),
        verbose: overrides.verbose,
        quiet: overrides.json,
    }
}

async fn run(paths: Vec<PathBuf>, builtin: Option<String>, overrides: RunOverrides) -> Result<bool> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, &overrides)?;

    let scenarios = load_scenarios(&paths, builtin.as_deref())?;
    let config = &config;
    let (results, failure) = run_each(config, &scenarios, &overrides, || async move {
        let browser = WebDriverClient::connect(config).await?;
        tracing::debug!("Browser session {}", browser.session_id());
        Ok::<_, Error>(browser)
    })
    .await;

    // Scenarios that already ran are reported even when a later session fails
    if !results.is_empty() || failure.is_none() {
        report(&results, overrides.json)?;
    }
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(results.iter().all(|r| r.passed))
}

/// Run scenarios one after another, each on a fresh browser session
///
/// Stops at the first session that cannot be started and returns that error
/// alongside the results gathered before it.
async fn run_each<B, F, Fut>(
    config: &Config,
    scenarios: &[Scenario],
    overrides: &RunOverrides,
    mut connect: F,
) -> (Vec<ScenarioResult>, Option<Error>)
where
    B: Browser,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<B>>,
{
    let mut results: Vec<ScenarioResult> = Vec::with_capacity(scenarios.len());

    // Sequential on purpose: each scenario owns its own browser session
    for scenario in scenarios {
        let options = run_options(config, scenario, overrides);
        tracing::debug!(?options, "Run options for '{}'", scenario.name);

        let mut browser = match connect().await {
            Ok(browser) => browser,
            Err(e) => {
                tracing::warn!("Could not start a session for '{}': {}", scenario.name, e);
                return (results, Some(e));
            }
        };
        results.push(scenario::run_scenario(&mut browser, scenario, &options).await);
    }

    (results, None)
}

fn report(results: &[ScenarioResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else if results.len() > 1 {
        print_summary(results);
    }
    Ok(())
}

fn print_summary(results: &[ScenarioResult]) {
    println!("{}", "Summary:".cyan());
    for r in results {
        if r.passed {
            println!(
                "  {} {} ({} steps, {}ms)",
                "✓".green(),
                r.name,
                r.steps_total,
                r.duration_ms
            );
        } else {
            println!(
                "  {} {} (failed at step {}/{})",
                "✗".red(),
                r.name,
                r.failed_step.unwrap_or(r.steps_run),
                r.steps_total
            );
        }
    }
    let passed = results.iter().filter(|r| r.passed).count();
    println!("\n  {}/{} scenarios passed\n", passed, results.len());
}

fn validate(paths: &[PathBuf]) -> Result<bool> {
    let mut all_valid = true;
    for path in paths {
        match Scenario::load(path) {
            Ok(s) => println!(
                "  {} {} ({}, {} steps)",
                "✓".green(),
                path.display(),
                s.name,
                s.steps.len()
            ),
            Err(e) => {
                all_valid = false;
                println!("  {} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }
    Ok(all_valid)
}

fn show_logs(lines: usize, clear: bool) -> Result<()> {
    if clear {
        logging::truncate_run_log()?;
        println!("Run log cleared");
        return Ok(());
    }

    let Some(path) = paths::run_log_path() else {
        return Err(Error::Config("Could not determine log directory".to_string()));
    };
    if !path.exists() {
        println!("No run log yet at {}", path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        println!("{}", line);
    }
    Ok(())
}
