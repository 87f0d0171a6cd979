//! Server settings read from `CONTRACTS_*` environment variables.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::TemplateSource;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TEMPLATE: &str = "./templates/contract_template.docx";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JSON_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub template: TemplateSource,
    pub http_timeout: Duration,
    pub json_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset and blank keys
    /// take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout_secs: u64 =
            parse(&get, "CONTRACTS_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CONTRACTS_HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(AppConfig {
            host: get("CONTRACTS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse(&get, "CONTRACTS_PORT", DEFAULT_PORT)?,
            template: TemplateSource::parse(
                &get("CONTRACTS_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            ),
            http_timeout: Duration::from_secs(http_timeout_secs),
            json_limit: parse(&get, "CONTRACTS_JSON_LIMIT_BYTES", DEFAULT_JSON_LIMIT_BYTES)?,
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(err) => Err(ConfigError::Invalid {
                key,
                reason: err.to_string(),
                value,
            }),
        },
    }
}
