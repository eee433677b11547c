//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenarios, plus the
//! load-time checks that catch authoring mistakes before a browser starts.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};
use crate::driver::keys;

use super::vars::interpolate;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of the workflow under test
    pub description: Option<String>,
    /// Base URL overriding the configured one
    pub base_url: Option<String>,
    /// Constants referenced as `${name}` in step text
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
}

/// A single step in the execution flow
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a page, relative to the base URL unless absolute
    Navigate { url: String },
    /// Wait for a target to exist, optionally remembering it under a name
    Locate {
        target: Target,
        #[serde(rename = "as")]
        alias: Option<String>,
        timeout_ms: Option<u64>,
    },
    /// Resolve a target, then perform interactions on it in order
    Interact {
        target: Target,
        perform: Vec<Interaction>,
        timeout_ms: Option<u64>,
    },
    /// Wait until the target exists
    AssertPresent {
        target: Target,
        timeout_ms: Option<u64>,
    },
    /// Wait until the target no longer exists
    AssertAbsent {
        target: Target,
        timeout_ms: Option<u64>,
    },
    /// Wait until the current URL contains a fragment
    AssertUrlContains {
        fragment: String,
        timeout_ms: Option<u64>,
    },
}

/// One link of a target chain
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// CSS selector matched from the document root
    Get(String),
    /// CSS selector matched below the current subject
    Find(String),
    /// First element at or below the subject whose own text contains the text
    Contains(String),
    /// Parent of each subject element
    Parent,
    /// Target chain stored by an earlier `locate ... as`
    Alias(String),
}

/// Ordered chain of queries, resolved left to right
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Target(pub Vec<Query>);

/// Something done to a located element
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Click,
    /// Type text; `{enter}`-style sequences press special keys
    Type(String),
    Clear,
    /// Force-show a control that is hidden until hover
    Show,
}

impl Scenario {
    /// Read, parse and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate scenario YAML, substituting `vars` into every step
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: Scenario =
            serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse(e.to_string()))?;
        let scenario = raw.interpolated()?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Copy of the scenario with every `${name}` replaced
    fn interpolated(self) -> Result<Self> {
        let vars = self.vars;
        let sub = |s: &str| interpolate(s, &vars);

        let base_url = self.base_url.as_deref().map(sub).transpose()?;
        let steps = self
            .steps
            .into_iter()
            .map(|step| step.interpolated(&vars))
            .collect::<Result<Vec<_>>>()?;

        Ok(Scenario {
            name: self.name,
            description: self.description,
            base_url,
            vars,
            steps,
        })
    }

    /// Check structural rules that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ScenarioInvalid("scenario name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(Error::ScenarioInvalid(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }

        let mut aliases: HashSet<&str> = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;
            let invalid = |msg: String| Error::ScenarioInvalid(format!("step {}: {}", step_num, msg));

            if let Some(target) = step.target() {
                target.validate(&aliases).map_err(invalid)?;
            }

            match step {
                Step::Navigate { url } if url.trim().is_empty() => {
                    return Err(invalid("navigate url is empty".to_string()));
                }
                Step::AssertUrlContains { fragment, .. } if fragment.is_empty() => {
                    return Err(invalid("url fragment is empty".to_string()));
                }
                Step::Interact { perform, .. } => {
                    if perform.is_empty() {
                        return Err(invalid("'perform' lists no interactions".to_string()));
                    }
                    for interaction in perform {
                        if let Interaction::Type(text) = interaction {
                            keys::expand(text).map_err(|e| invalid(e.to_string()))?;
                        }
                    }
                }
                Step::Locate {
                    alias: Some(name), ..
                } => {
                    if name.trim().is_empty() {
                        return Err(invalid("alias name is empty".to_string()));
                    }
                    aliases.insert(name.as_str());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl Step {
    /// Target chain of the step, if it has one
    pub fn target(&self) -> Option<&Target> {
        match self {
            Step::Locate { target, .. }
            | Step::Interact { target, .. }
            | Step::AssertPresent { target, .. }
            | Step::AssertAbsent { target, .. } => Some(target),
            Step::Navigate { .. } | Step::AssertUrlContains { .. } => None,
        }
    }

    /// Per-step timeout override in milliseconds
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Step::Locate { timeout_ms, .. }
            | Step::Interact { timeout_ms, .. }
            | Step::AssertPresent { timeout_ms, .. }
            | Step::AssertAbsent { timeout_ms, .. }
            | Step::AssertUrlContains { timeout_ms, .. } => *timeout_ms,
            Step::Navigate { .. } => None,
        }
    }

    fn interpolated(self, vars: &BTreeMap<String, String>) -> Result<Self> {
        let sub = |s: String| interpolate(&s, vars);
        Ok(match self {
            Step::Navigate { url } => Step::Navigate { url: sub(url)? },
            Step::Locate {
                target,
                alias,
                timeout_ms,
            } => Step::Locate {
                target: target.interpolated(vars)?,
                alias,
                timeout_ms,
            },
            Step::Interact {
                target,
                perform,
                timeout_ms,
            } => Step::Interact {
                target: target.interpolated(vars)?,
                perform: perform
                    .into_iter()
                    .map(|i| match i {
                        Interaction::Type(text) => sub(text).map(Interaction::Type),
                        other => Ok(other),
                    })
                    .collect::<Result<Vec<_>>>()?,
                timeout_ms,
            },
            Step::AssertPresent { target, timeout_ms } => Step::AssertPresent {
                target: target.interpolated(vars)?,
                timeout_ms,
            },
            Step::AssertAbsent { target, timeout_ms } => Step::AssertAbsent {
                target: target.interpolated(vars)?,
                timeout_ms,
            },
            Step::AssertUrlContains {
                fragment,
                timeout_ms,
            } => Step::AssertUrlContains {
                fragment: sub(fragment)?,
                timeout_ms,
            },
        })
    }
}

impl Target {
    pub fn queries(&self) -> &[Query] {
        &self.0
    }

    fn interpolated(self, vars: &BTreeMap<String, String>) -> Result<Self> {
        self.0
            .into_iter()
            .map(|q| {
                Ok(match q {
                    Query::Get(s) => Query::Get(interpolate(&s, vars)?),
                    Query::Find(s) => Query::Find(interpolate(&s, vars)?),
                    Query::Contains(s) => Query::Contains(interpolate(&s, vars)?),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Target)
    }

    fn validate(&self, aliases: &HashSet<&str>) -> std::result::Result<(), String> {
        let Some(first) = self.0.first() else {
            return Err("target is empty".to_string());
        };
        if matches!(first, Query::Parent | Query::Find(_)) {
            return Err(format!("target cannot start with '{}'", first));
        }

        for (i, query) in self.0.iter().enumerate() {
            match query {
                Query::Alias(name) => {
                    if i != 0 {
                        return Err(format!("alias '@{}' must start the target", name));
                    }
                    if !aliases.contains(name.as_str()) {
                        return Err(format!(
                            "alias '@{}' is not defined by an earlier locate step",
                            name
                        ));
                    }
                }
                Query::Get(s) | Query::Find(s) | Query::Contains(s) if s.is_empty() => {
                    return Err(format!("empty argument to '{}'", query));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Get(s) => write!(f, "get '{}'", s),
            Query::Find(s) => write!(f, "find '{}'", s),
            Query::Contains(s) => write!(f, "contains '{}'", s),
            Query::Parent => write!(f, "parent"),
            Query::Alias(name) => write!(f, "@{}", name),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|q| q.to_string()).collect();
        write!(f, "{}", parts.join(" > "))
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interaction::Click => write!(f, "click"),
            Interaction::Type(text) => write!(f, "type '{}'", text),
            Interaction::Clear => write!(f, "clear"),
            Interaction::Show => write!(f, "show"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate '{}'", url),
            Step::Locate { target, alias, .. } => match alias {
                Some(name) => write!(f, "locate {} as @{}", target, name),
                None => write!(f, "locate {}", target),
            },
            Step::Interact {
                target, perform, ..
            } => {
                let actions: Vec<String> = perform.iter().map(|i| i.to_string()).collect();
                write!(f, "{} on {}", actions.join(", "), target)
            }
            Step::AssertPresent { target, .. } => write!(f, "assert present: {}", target),
            Step::AssertAbsent { target, .. } => write!(f, "assert absent: {}", target),
            Step::AssertUrlContains { fragment, .. } => {
                write!(f, "assert url contains '{}'", fragment)
            }
        }
    }
}
