//! Logging setup for the `pipeline-ml` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. The filter comes from `PIPELINE_ML_LOG`, then `RUST_LOG`,
//! then the configured level.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

pub const LOG_ENV_VAR: &str = "PIPELINE_ML_LOG";

static INIT: OnceCell<()> = OnceCell::new();

/// Resolve the filter directive from the environment lookups and config
pub fn filter_directive<F>(config: &LoggingConfig, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(LOG_ENV_VAR)
        .or_else(|| lookup("RUST_LOG"))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_logging(config: &LoggingConfig) {
    INIT.get_or_init(|| {
        let directive = filter_directive(config, |key| std::env::var(key).ok());
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("Invalid log filter {directive:?} ({err}), falling back to info");
            EnvFilter::new("info")
        });

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        let result = match config.format {
            LogFormat::Plain => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        if let Err(err) = result {
            eprintln!("Logging already initialised: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_precedence() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Plain,
        };
        assert_eq!(filter_directive(&config, |_| None), "warn");
        assert_eq!(
            filter_directive(&config, |k| (k == "RUST_LOG").then(|| "debug".to_string())),
            "debug"
        );
        assert_eq!(
            filter_directive(&config, |_| Some("pipeline_ml=trace".to_string())),
            "pipeline_ml=trace"
        );
        assert_eq!(filter_directive(&config, |_| Some("  ".to_string())), "warn");
    }
}
