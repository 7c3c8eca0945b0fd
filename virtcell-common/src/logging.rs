//! Logging initialization using tracing.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for terminals
    #[default]
    Pretty,
    /// JSON lines for log aggregation
    Json,
}

impl LogFormat {
    /// Parse a format name; anything but "json" is pretty.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Example
/// ```rust,ignore
/// virtcell_common::init_logging("info", LogFormat::Pretty).unwrap();
/// ```
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .init(),
    }

    Ok(())
}
