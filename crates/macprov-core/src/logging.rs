//! tracing-subscriber setup for hosts embedding the provider
//!
//! The library only emits events; installing a subscriber is the host's call.

use crate::config::LogConfig;
use crate::types::LogFormat;

/// Install a global subscriber honoring `RUST_LOG` first, then `level`.
///
/// Returns false when a global subscriber was already installed.
pub fn init_logging(level: &str, format: LogFormat) -> bool {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .is_ok(),
    }
}

pub fn init_from_config(log: &LogConfig) -> bool {
    init_logging(&log.level, log.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_already_installed() {
        let _ = init_logging("debug", LogFormat::Text);
        assert!(!init_from_config(&LogConfig::default()));
    }
}
