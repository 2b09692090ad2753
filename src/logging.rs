// src/logging.rs

//! Logging setup for `fstrigger` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. the `--log-level` CLI flag
//! 2. the `FSTRIGGER_LOG` environment variable, which takes full
//!    `EnvFilter` directives (e.g. `"info,fstrigger::detect=debug"`)
//! 3. `info`
//!
//! Logs go to STDERR; STDOUT only carries `TRIGGERED` lines.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable read when `--log-level` is not given.
pub const LOG_ENV_VAR: &str = "FSTRIGGER_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directive_for(lvl)),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|raw| filter_from_env_value(&raw))
            .unwrap_or_else(|| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
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

/// `None` for blank or unparsable values, so a typo falls back to `info`.
fn filter_from_env_value(raw: &str) -> Option<EnvFilter> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = if raw.eq_ignore_ascii_case("warning") {
        "warn".to_string()
    } else {
        raw.to_lowercase()
    };
    EnvFilter::try_new(normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values() {
        assert!(filter_from_env_value("  ").is_none());
        assert!(filter_from_env_value(" Debug ").is_some());
        assert!(filter_from_env_value("warning").is_some());
        assert!(filter_from_env_value("info,fstrigger::detect=trace").is_some());
        assert!(filter_from_env_value("fstrigger=[").is_none());
    }
}
