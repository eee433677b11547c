//! Platform configuration and data paths

use std::io;
use std::path::PathBuf;

/// Application name used for the platform directories
const APP_NAME: &str = "uiflow";

/// Name of the run log file inside the log directory
pub const RUN_LOG_NAME: &str = "runs.log";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/uiflow/`
/// - macOS: `~/Library/Application Support/uiflow/`
/// - Windows: `%APPDATA%\uiflow\`
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// Get the path to the run log file
pub fn run_log_path() -> Option<PathBuf> {
    log_dir().map(|d| d.join(RUN_LOG_NAME))
}

/// Ensure the log directory exists
pub fn ensure_log_dir() -> io::Result<Option<PathBuf>> {
    if let Some(dir) = log_dir() {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}
