//! Server configuration read from environment variables.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::service::CreateResponse;

/// Source of environment variables.
///
/// Tests supply a `MockEnvironment` instead of mutating the process
/// environment, which parallel tests would race on.
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables for tests.
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-call deadline for store operations. `None` leaves calls unbounded.
    pub store_timeout: Option<Duration>,
    pub create_response: CreateResponse,
    pub logging: LoggingConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_provider(&SystemEnvironment)
    }

    pub fn from_provider(env: &dyn EnvironmentProvider) -> Result<Self, ConfigError> {
        let host = env
            .get_var("ITEMS_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match env.get_var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => 3000,
        };

        let store_timeout = match env.get_var("ITEMS_STORE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "ITEMS_STORE_TIMEOUT_MS",
                        value: raw,
                        reason: "expected a positive number of milliseconds",
                    })
                }
            },
            None => None,
        };

        let create_response = if parse_bool(env, "ITEMS_CREATE_READ_BACK")? {
            CreateResponse::ReadBack
        } else {
            CreateResponse::WallClock
        };

        let logging = LoggingConfig {
            log_level: env
                .get_var("LOG_LEVEL")
                .unwrap_or_else(|| "info".to_string()),
            log_json: parse_bool(env, "LOG_JSON")?,
        };

        Ok(Self {
            host,
            port,
            store_timeout,
            create_response,
            logging,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(env: &dyn EnvironmentProvider, key: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = env.get_var(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected true or false",
        }),
    }
}
