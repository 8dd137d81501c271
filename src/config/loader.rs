//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let toml = r#"
            [[services]]
            name = "search"
            base_url = "http://127.0.0.1:3001"

            [[routes]]
            name = "search"
            path_prefix = "/api/search"
            service = "search"
            route_class = "search"
        "#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.retryable_transport_errors.len(), 4);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(
            config.routes[0].route_class,
            crate::config::schema::RouteClass::Search
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_transport_error_classes_parse_from_toml() {
        let toml = r#"
            [retries]
            retryable_transport_errors = ["timeout", "connection_refused"]
        "#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        use crate::resilience::retry::TransportErrorKind;
        assert_eq!(
            config.retries.retryable_transport_errors,
            vec![
                TransportErrorKind::Timeout,
                TransportErrorKind::ConnectionRefused
            ]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
