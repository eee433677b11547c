//! Scenarios embedded in the binary

use crate::common::{Error, Result};

use super::config::Scenario;

const PIPELINE_LIFECYCLE: &str = include_str!("../../scenarios/pipeline_lifecycle.yaml");

static BUILTINS: &[(&str, &str)] = &[("pipeline-lifecycle", PIPELINE_LIFECYCLE)];

/// Names of all embedded scenarios
pub fn builtin_names() -> Vec<&'static str> {
    BUILTINS.iter().map(|(name, _)| *name).collect()
}

/// YAML source of an embedded scenario
pub fn builtin_source(name: &str) -> Result<&'static str> {
    BUILTINS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, src)| *src)
        .ok_or_else(|| Error::UnknownBuiltin {
            name: name.to_string(),
            available: builtin_names().join(", "),
        })
}

/// Parse an embedded scenario
pub fn builtin(name: &str) -> Result<Scenario> {
    Scenario::from_yaml(builtin_source(name)?)
}
