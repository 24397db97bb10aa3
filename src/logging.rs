// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. explicit level passed by the caller (e.g. `[config].log_level`)
//! 2. `MANUALLABOUR_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR so that stdout stays free for exported documents.

use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tracing_subscriber::fmt;

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV_VAR: &str = "MANUALLABOUR_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

/// Initialise the global logging subscriber.
///
/// Fails if a global subscriber was already installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = effective_level(level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

/// Resolve the level from an explicit choice and the raw env value.
pub fn effective_level(explicit: Option<LogLevel>, env_value: Option<&str>) -> tracing::Level {
    explicit
        .or_else(|| env_value.and_then(|s| s.parse().ok()))
        .map(level_from_log_level)
        .unwrap_or(tracing::Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}
