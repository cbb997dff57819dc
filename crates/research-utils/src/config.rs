//! Process-level configuration shared by binaries

use crate::LogFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while reading process configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be parsed
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name, reported by the health endpoint
    pub app_name: String,
    /// Environment (development, production)
    pub environment: Environment,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Financial Research Assistant".to_string(),
            environment: Environment::Development,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Read `APP_NAME`, `APP_ENV` and `LOG_FORMAT` from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            None | Some("") => defaults.environment,
            Some("development" | "dev") => Environment::Development,
            Some("production" | "prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "APP_ENV".to_string(),
                    reason: format!("unknown environment '{other}'"),
                });
            }
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                reason,
            })?,
            // Structured logs by default once deployed
            None if environment == Environment::Production => LogFormat::Json,
            None => defaults.log_format,
        };

        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            environment,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.app_name, "Financial Research Assistant");
    }

    #[test]
    fn test_production_defaults_to_json_logs() {
        let config = Config::from_lookup(lookup(&[("APP_ENV", "prod")])).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_log_format_wins() {
        let config = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_environment() {
        let err = Config::from_lookup(lookup(&[("APP_ENV", "staging")])).unwrap_err();
        assert!(err.to_string().contains("APP_ENV"));
    }
}
