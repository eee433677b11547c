//! Scenario executor
//!
//! Interprets steps strictly in order against one browser session. Lookups
//! and assertions poll until they hold or their timeout elapses; the first
//! step that fails aborts the rest of the scenario.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::driver::{keys, Browser, ElementRef, Locator};

use super::config::{Interaction, Query, Scenario, Step};

/// Settings for one scenario run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Base URL relative `navigate` steps are joined to
    pub base_url: String,
    /// Polling window for steps without a `timeout_ms`
    pub default_timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Where to save a screenshot when a step fails
    pub screenshot_dir: Option<PathBuf>,
    /// Print per-step detail
    pub verbose: bool,
    /// Suppress human-readable output (used for JSON reports)
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11011".to_string(),
            default_timeout: Duration::from_millis(4000),
            poll_interval: Duration::from_millis(100),
            screenshot_dir: None,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of a scenario run
#[derive(Debug, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    /// 1-based number of the step that failed
    pub failed_step: Option<usize>,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
    pub duration_ms: u64,
}

/// Outcome of evaluating a target chain once
enum Lookup {
    Found(Vec<ElementRef>),
    /// The link at this index matched nothing
    Missing(usize),
}

/// Run a scenario to completion or first failure, then close the browser
pub async fn run_scenario<B: Browser>(
    browser: &mut B,
    scenario: &Scenario,
    options: &RunOptions,
) -> ScenarioResult {
    let started = Instant::now();
    let steps_total = scenario.steps.len();

    if !options.quiet {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("\n{}", "Steps:".cyan());
    }

    tracing::info!(scenario = %scenario.name, steps = steps_total, "Scenario started");

    let mut executor = Executor::new(browser, options);
    let mut failure: Option<(usize, Error)> = None;

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        tracing::debug!("Step {}: {}", step_num, step);

        match executor.execute_step(step).await {
            Ok(()) => {
                if !options.quiet {
                    println!("  {} Step {}: {}", "✓".green(), step_num, step.to_string().dimmed());
                }
            }
            Err(e) => {
                tracing::warn!("Step {} failed: {}", step_num, e);
                if !options.quiet {
                    println!("  {} Step {}: {}", "✗".red(), step_num, step);
                    println!("    {}", e.to_string().red());
                }
                failure = Some((step_num, e));
                break;
            }
        }
    }

    let screenshot = match (&failure, &options.screenshot_dir) {
        (Some((step_num, _)), Some(dir)) => {
            save_screenshot(executor.browser, dir, &scenario.name, *step_num).await
        }
        _ => None,
    };

    // Cleanup: end the browser session whatever the outcome
    if let Err(e) = executor.browser.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    let duration_ms = started.elapsed().as_millis() as u64;

    match failure {
        None => {
            tracing::info!(scenario = %scenario.name, duration_ms, "Scenario passed");
            if !options.quiet {
                println!("\n{} {}\n", "✓".green().bold(), "Scenario Passed".green().bold());
            }
            ScenarioResult {
                name: scenario.name.clone(),
                passed: true,
                steps_run: steps_total,
                steps_total,
                failed_step: None,
                error: None,
                screenshot: None,
                duration_ms,
            }
        }
        Some((step_num, e)) => {
            let detail = format!("{} ({})", e, scenario.steps[step_num - 1]);
            tracing::info!(scenario = %scenario.name, step = step_num, "Scenario failed");
            if !options.quiet {
                if let Some(path) = &screenshot {
                    println!("    Screenshot: {}", path.display().to_string().dimmed());
                }
                println!("\n{} {}\n", "✗".red().bold(), "Scenario Failed".red().bold());
            }
            ScenarioResult {
                name: scenario.name.clone(),
                passed: false,
                steps_run: step_num,
                steps_total,
                failed_step: Some(step_num),
                error: Some(detail),
                screenshot,
                duration_ms,
            }
        }
    }
}

/// Interprets steps against a browser it borrows exclusively
pub struct Executor<'a, B: Browser> {
    browser: &'a mut B,
    options: &'a RunOptions,
    /// Alias name -> target chain, already expanded
    aliases: HashMap<String, Vec<Query>>,
    step_num: usize,
}

impl<'a, B: Browser> Executor<'a, B> {
    pub fn new(browser: &'a mut B, options: &'a RunOptions) -> Self {
        Self {
            browser,
            options,
            aliases: HashMap::new(),
            step_num: 0,
        }
    }

    /// Execute the next step; failures carry the step number
    pub async fn execute_step(&mut self, step: &Step) -> Result<()> {
        self.step_num += 1;
        let timeout = step
            .timeout_ms()
            .map(Duration::from_millis)
            .unwrap_or(self.options.default_timeout);

        let result = match step {
            Step::Navigate { url } => self.navigate(url).await,
            Step::Locate { target, alias, .. } => {
                let chain = self.expand_aliases(target.queries())?;
                let elements = self.resolve(&chain, timeout).await?;
                if self.options.verbose {
                    println!("    {} element(s) matched", elements.len());
                }
                if let Some(name) = alias {
                    self.aliases.insert(name.clone(), chain);
                }
                Ok(())
            }
            Step::Interact {
                target, perform, ..
            } => {
                let chain = self.expand_aliases(target.queries())?;
                for interaction in perform {
                    self.interact(&chain, interaction, timeout).await?;
                }
                Ok(())
            }
            Step::AssertPresent { target, .. } => {
                let chain = self.expand_aliases(target.queries())?;
                self.resolve(&chain, timeout).await.map(|_| ())
            }
            Step::AssertAbsent { target, .. } => {
                let chain = self.expand_aliases(target.queries())?;
                self.wait_absent(&chain, timeout).await
            }
            Step::AssertUrlContains { fragment, .. } => self.wait_url(fragment, timeout).await,
        };

        result.map_err(|e| match e {
            Error::StepFailure { .. } => e,
            other => Error::step_failure(self.step_num, other.to_string()),
        })
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let full = join_url(&self.options.base_url, url);
        self.browser.navigate(&full).await
    }

    /// Replace a leading alias with the chain it names
    fn expand_aliases(&self, chain: &[Query]) -> Result<Vec<Query>> {
        match chain.first() {
            Some(Query::Alias(name)) => {
                let stored = self.aliases.get(name).ok_or_else(|| {
                    Error::step_failure(
                        self.step_num,
                        format!("alias '@{}' was never located", name),
                    )
                })?;
                let mut expanded = stored.clone();
                expanded.extend_from_slice(&chain[1..]);
                Ok(expanded)
            }
            _ => Ok(chain.to_vec()),
        }
    }

    /// Evaluate a chain once against the current page
    async fn lookup(&mut self, chain: &[Query]) -> Result<Lookup> {
        let mut subject: Option<Vec<ElementRef>> = None;

        for (i, query) in chain.iter().enumerate() {
            let next = match query {
                Query::Get(css) => {
                    self.browser
                        .find_all(&Locator::Css(css.clone()), None)
                        .await?
                }
                Query::Find(css) => {
                    let locator = Locator::Css(css.clone());
                    let mut found = Vec::new();
                    for el in subject.iter().flatten() {
                        found.extend(self.browser.find_all(&locator, Some(el)).await?);
                    }
                    found
                }
                Query::Contains(text) => {
                    let locator = Locator::ContainsText(text.clone());
                    let matches = match &subject {
                        None => self.browser.find_all(&locator, None).await?,
                        Some(scopes) => {
                            let mut first = Vec::new();
                            for el in scopes {
                                first = self.browser.find_all(&locator, Some(el)).await?;
                                if !first.is_empty() {
                                    break;
                                }
                            }
                            first
                        }
                    };
                    // Only the first match becomes the subject
                    matches.into_iter().take(1).collect()
                }
                Query::Parent => {
                    let mut parents: Vec<ElementRef> = Vec::new();
                    for el in subject.iter().flatten() {
                        for parent in self.browser.find_all(&Locator::Parent, Some(el)).await? {
                            if !parents.contains(&parent) {
                                parents.push(parent);
                            }
                        }
                    }
                    parents
                }
                Query::Alias(name) => {
                    return Err(Error::step_failure(
                        self.step_num,
                        format!("alias '@{}' must start the target", name),
                    ))
                }
            };

            if next.is_empty() {
                return Ok(Lookup::Missing(i));
            }
            subject = Some(next);
        }

        Ok(Lookup::Found(subject.unwrap_or_default()))
    }

    /// Poll until the chain matches at least one element
    async fn resolve(&mut self, chain: &[Query], timeout: Duration) -> Result<Vec<ElementRef>> {
        let deadline = Instant::now() + timeout;
        let mut missing_at = 0;
        // Set when the most recent lookup hit a transient driver error
        let mut last_error: Option<Error> = None;

        loop {
            match self.lookup(chain).await {
                Ok(Lookup::Found(elements)) => return Ok(elements),
                Ok(Lookup::Missing(i)) => {
                    missing_at = i;
                    last_error = None;
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!("Transient lookup error, retrying: {}", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                let reason = match &last_error {
                    Some(e) => format!("last lookup failed: {}", e),
                    None => format!("no element matched {}", chain[missing_at]),
                };
                return Err(Error::step_failure(
                    self.step_num,
                    format!(
                        "Timed out after {}ms waiting for {}: {}",
                        timeout.as_millis(),
                        describe_chain(chain),
                        reason
                    ),
                ));
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Poll until the chain matches nothing
    async fn wait_absent(&mut self, chain: &[Query], timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            // Matched count, or the transient error that hid it
            let seen: std::result::Result<usize, Error> = match self.lookup(chain).await {
                Ok(Lookup::Missing(_)) => return Ok(()),
                Ok(Lookup::Found(elements)) => Ok(elements.len()),
                Err(e) if e.is_transient() => Err(e),
                Err(e) => return Err(e),
            };

            if Instant::now() >= deadline {
                let reason = match seen {
                    Ok(count) => format!("still matched {} element(s), expected none", count),
                    Err(e) => format!("could not confirm it is gone, last lookup failed: {}", e),
                };
                return Err(Error::step_failure(
                    self.step_num,
                    format!(
                        "Timed out after {}ms: {} {}",
                        timeout.as_millis(),
                        describe_chain(chain),
                        reason
                    ),
                ));
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Poll until the current URL contains the fragment
    async fn wait_url(&mut self, fragment: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let url = self.browser.current_url().await?;
            if url.contains(fragment) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(Error::step_failure(
                    self.step_num,
                    format!(
                        "Timed out after {}ms: expected URL to contain '{}', got '{}'",
                        timeout.as_millis(),
                        fragment,
                        url
                    ),
                ));
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Resolve the chain and apply one interaction to its first element
    ///
    /// Transient driver errors re-resolve and retry within the same window.
    async fn interact(
        &mut self,
        chain: &[Query],
        interaction: &Interaction,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let elements = self.resolve(chain, remaining).await?;
            if elements.len() > 1 {
                tracing::debug!(
                    "{} matched {} elements, acting on the first",
                    describe_chain(chain),
                    elements.len()
                );
            }
            let element = &elements[0];

            let outcome = match interaction {
                Interaction::Click => self.browser.click(element).await,
                Interaction::Type(text) => {
                    let keys = keys::expand(text)?;
                    self.browser.send_keys(element, &keys).await
                }
                Interaction::Clear => self.browser.clear(element).await,
                Interaction::Show => self.browser.show(element).await,
            };

            match outcome {
                Ok(()) => {
                    if self.options.verbose {
                        println!("    {} {}", interaction, describe_chain(chain).dimmed());
                    }
                    return Ok(());
                }
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    tracing::debug!("{} not actionable yet: {}", interaction, e);
                    tokio::time::sleep(self.options.poll_interval).await;
                }
                Err(e) => {
                    return Err(Error::step_failure(
                        self.step_num,
                        format!("Could not {} {}: {}", interaction, describe_chain(chain), e),
                    ))
                }
            }
        }
    }
}

/// Join a possibly relative URL onto the base URL
pub fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

fn describe_chain(chain: &[Query]) -> String {
    let parts: Vec<String> = chain.iter().map(|q| q.to_string()).collect();
    parts.join(" > ")
}

/// Save a PNG of the page for a failed step; failures here are only logged
async fn save_screenshot<B: Browser>(
    browser: &mut B,
    dir: &Path,
    scenario_name: &str,
    step_num: usize,
) -> Option<PathBuf> {
    let png = match browser.screenshot().await {
        Ok(png) => png,
        Err(e) => {
            tracing::warn!("Could not take screenshot: {}", e);
            return None;
        }
    };

    let file = dir.join(format!(
        "{}-step{}.png",
        sanitize_file_name(scenario_name),
        step_num
    ));
    let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&file, png));
    match written {
        Ok(()) => Some(file),
        Err(e) => {
            tracing::warn!("Could not write screenshot '{}': {}", file.display(), e);
            None
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
