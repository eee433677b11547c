//! Logging and tracing configuration
//!
//! Terminal output stays terse; the run log in the data directory keeps the
//! full WebDriver conversation for post-mortem debugging.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::paths;

/// Keeps the background log writer alive; drop it last in `main`
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
    pub log_file: Option<PathBuf>,
}

/// Initialize tracing for the CLI
///
/// Logs go to:
/// 1. stderr, filtered by `RUST_LOG` (default: INFO for this crate, WARN for
///    dependencies, DEBUG for this crate with `verbose`)
/// 2. `~/.local/share/uiflow/logs/runs.log` at TRACE, when the directory is
///    writable
pub fn init_cli(verbose: bool) -> LogGuard {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("uiflow=debug,warn")
        } else {
            EnvFilter::new("uiflow=info,warn")
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(stderr_filter);

    let log_dir = match paths::ensure_log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: Could not create log directory: {}", e);
            None
        }
    };

    if let Some(dir) = log_dir {
        let appender = tracing_appender::rolling::never(&dir, paths::RUN_LOG_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new("uiflow=trace,info"));

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .init();

        return LogGuard {
            _guard: Some(guard),
            log_file: Some(dir.join(paths::RUN_LOG_NAME)),
        };
    }

    // Fallback: stderr only
    tracing_subscriber::registry().with(stderr_layer).init();

    LogGuard {
        _guard: None,
        log_file: None,
    }
}

/// Truncate the run log file
pub fn truncate_run_log() -> std::io::Result<()> {
    if let Some(path) = paths::run_log_path() {
        if path.exists() {
            std::fs::write(&path, "")?;
        }
    }
    Ok(())
}
