//! UI scenario runner
//!
//! Reads YAML scenarios describing one user workflow as an ordered list of
//! navigate / locate / interact / assert steps, and executes them against a
//! [`Browser`](crate::driver::Browser) with uniform polling and
//! abort-on-first-failure semantics.

mod builtin;
mod config;
mod runner;
mod vars;

pub use builtin::{builtin, builtin_names, builtin_source};
pub use config::*;
pub use runner::{join_url, run_scenario, Executor, RunOptions, ScenarioResult};
pub use vars::interpolate;
