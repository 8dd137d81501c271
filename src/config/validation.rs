//! Configuration validation.
//!
//! Serde handles syntactic checks; this module covers the semantic ones:
//! routes must reference defined services, base URLs must parse, and the
//! resilience parameters must be usable. All errors are collected and
//! returned together rather than failing on the first.

use std::collections::HashSet;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Config field the error refers to, dotted path style.
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration. Pure function; collects every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut service_names = HashSet::new();
    for service in &config.services {
        if !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError {
                field: "services".into(),
                message: format!("duplicate service name '{}'", service.name),
            });
        }
        match Url::parse(&service.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError {
                field: format!("services.{}.base_url", service.name),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: format!("services.{}.base_url", service.name),
                message: format!("invalid URL: {}", e),
            }),
        }
    }

    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError {
                field: "routes".into(),
                message: format!("duplicate route name '{}'", route.name),
            });
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError {
                field: format!("routes.{}.path_prefix", route.name),
                message: "path prefix must start with '/'".into(),
            });
        }
        if !service_names.contains(route.service.as_str()) {
            errors.push(ValidationError {
                field: format!("routes.{}.service", route.name),
                message: format!("references undefined service '{}'", route.service),
            });
        }
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError {
            field: "circuit_breaker.failure_threshold".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.circuit_breaker.cooldown_secs == 0 {
        errors.push(ValidationError {
            field: "circuit_breaker.cooldown_secs".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError {
            field: "retries.max_attempts".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.retries.multiplier == 0 {
        errors.push(ValidationError {
            field: "retries.multiplier".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.retries.max_delay_ms < config.retries.initial_delay_ms {
        errors.push(ValidationError {
            field: "retries.max_delay_ms".into(),
            message: "must not be smaller than initial_delay_ms".into(),
        });
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError {
                field: "rate_limit.window_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        for (field, limit) in [
            ("anonymous_limit", config.rate_limit.anonymous_limit),
            ("authenticated_limit", config.rate_limit.authenticated_limit),
            ("search_limit", config.rate_limit.search_limit),
        ] {
            if limit == 0 {
                errors.push(ValidationError {
                    field: format!("rate_limit.{}", field),
                    message: "must be at least 1".into(),
                });
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".into(),
            message: "must be at least 1".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
