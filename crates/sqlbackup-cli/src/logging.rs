//! Logging setup for the `sqlbackup` binary
//!
//! stdout carries the generated SQL script, so every log line goes to stderr.
//! `RUST_LOG` takes precedence over the configured default filter.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Whether to color the output
    pub ansi: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            include_location: false,
            ansi: true,
            default_filter: "warn,sqlbackup=info,sqlbackup_dump=info,sqlbackup_driver_oracle=info"
                .to_string(),
        }
    }
}

impl LoggingConfig {
    /// Debug-level output for `--verbose`
    pub fn verbose() -> Self {
        Self {
            include_location: true,
            ansi: true,
            default_filter: "warn,sqlbackup=debug,sqlbackup_core=debug,sqlbackup_dump=debug,sqlbackup_driver_oracle=debug"
                .to_string(),
        }
    }

    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose { Self::verbose() } else { Self::default() }
    }
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).try_init()?;

    tracing::debug!(filter = %config.default_filter, "logging initialized");
    Ok(())
}
