//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns an error if
/// the filter is invalid or a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_reports_error() {
        let config = LogConfig {
            level: "debug".to_string(),
        };
        // Another test may have installed a subscriber first; only the
        // second call in this test is guaranteed to fail.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
