//! Structured Logger
//!
//! Wraps `tracing` with a stderr console layer, an optional daily-rolling
//! JSON file layer, and `RUST_LOG`-based level control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling log (`chatloom.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "chatloom.log";

/// Initialize the global logger.
///
/// `RUST_LOG` takes precedence over `level`. When `log_dir` is set, NDJSON
/// records are also written there, rotated daily. Calling this twice is
/// harmless; the second subscriber is ignored.
pub fn init_logger(log_dir: Option<&Path>, level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}"))
    })?;

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
