// src/logging.rs

//! Logging setup for `frametasks` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `FRAMETASKS_LOG` environment variable, either a plain level ("debug")
//!    or full `EnvFilter` directives ("info,frametasks::scheduler=trace")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for `--stats-json`.
//! Thread names are included because every worker thread is named after its
//! pool (`frametasks-short-0`, `frametasks-long-1`, ...).

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV_VAR: &str = "FRAMETASKS_LOG";

/// Initialise global logging subscriber.
///
/// Call once at startup; a second call returns an error.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directive_for(lvl)),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| filter_from_env_value(&s))
            .unwrap_or_else(|| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn filter_from_env_value(s: &str) -> Option<EnvFilter> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = if s.eq_ignore_ascii_case("warning") {
        "warn".to_string()
    } else {
        s.to_lowercase()
    };
    EnvFilter::try_new(normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_accepts_levels_and_directives() {
        assert!(filter_from_env_value("debug").is_some());
        assert!(filter_from_env_value(" Warning ").is_some());
        assert!(filter_from_env_value("info,frametasks::scheduler=trace").is_some());
        assert!(filter_from_env_value("   ").is_none());
    }
}
