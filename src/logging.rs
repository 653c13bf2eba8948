// src/logging.rs

//! Log output for the `sitepipe` binary and its tests.
//!
//! The filter comes from, in order:
//! 1. `--log-level`, applied to every target;
//! 2. `SITEPIPE_LOG`, which takes full `EnvFilter` directives
//!    (`debug`, `sitepipe=trace,tower_http=debug`, ...);
//! 3. [`DEFAULT_DIRECTIVES`].
//!
//! Events go to stderr so stdout stays free for `--tasks`.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "SITEPIPE_LOG";

/// Used when neither the flag nor the variable is set. The HTTP stack is
/// kept at `warn` so a page load does not log every request.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,tower_http=warn";

/// Build the filter for `cli_level`, falling back to `SITEPIPE_LOG` and then
/// to `fallback`. An unparsable variable is reported on stderr and ignored.
pub fn env_filter(cli_level: Option<LogLevel>, fallback: &str) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(directive_for(level));
    }

    match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            EnvFilter::try_new(value.trim()).unwrap_or_else(|e| {
                eprintln!("ignoring {LOG_ENV}={value:?}: {e}");
                EnvFilter::new(fallback)
            })
        }
        _ => EnvFilter::new(fallback),
    }
}

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(env_filter(cli_level, DEFAULT_DIRECTIVES))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn cli_level_wins() {
        let filter = env_filter(Some(LogLevel::Trace), "error");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn fallback_directives_parse() {
        EnvFilter::try_new(DEFAULT_DIRECTIVES).unwrap();
    }
}
