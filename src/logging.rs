use crate::config::{ConfigError, LoggingConfig};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Parse a log level name (error, warn, info, debug, trace)
pub fn parse_level(level: &str) -> Result<Level, ConfigError> {
    match level.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(ConfigError::InvalidValue(format!(
            "Invalid log level: {level}. Valid levels are: error, warn, info, debug, trace"
        ))),
    }
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Installing twice is
/// not an error; the first subscriber stays in place.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let log_level = config.level.as_deref().unwrap_or("info");
    parse_level(log_level)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.to_lowercase()))
        .map_err(|e| ConfigError::InvalidValue(format!("Failed to create log filter: {e}")))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .try_init()
        .is_ok();

    if installed {
        debug!("Logging initialized with level: {}", log_level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error").unwrap(), Level::ERROR);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_level("Info").unwrap(), Level::INFO);
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("trace").unwrap(), Level::TRACE);
    }

    #[test]
    fn test_parse_level_invalid() {
        let err = parse_level("verbose").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_init_logging_rejects_invalid_level() {
        let config = LoggingConfig {
            level: Some("loud".to_string()),
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_init_logging_twice() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
