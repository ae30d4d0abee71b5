//! Engine configuration from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::context::{RequestContext, DEFAULT_CALL_TIMEOUT};
use crate::engine::DEFAULT_MAX_BATCH_SIZE;
use crate::models::UserId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Bound applied to every collaborator call.
    pub call_timeout: Duration,
    /// UTC hour at which the study day rolls over.
    pub day_rollover_hour: u32,
    pub max_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            day_rollover_hour: 0,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl EngineConfig {
    /// Read configuration from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, applying defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_ms = parse_var(
            &lookup,
            "STUDY_CALL_TIMEOUT_MS",
            defaults.call_timeout.as_millis() as u64,
        )?;
        let day_rollover_hour = parse_var(&lookup, "STUDY_DAY_ROLLOVER_HOUR", 0u32)?;
        if day_rollover_hour > 23 {
            return Err(ConfigError::Invalid {
                name: "STUDY_DAY_ROLLOVER_HOUR",
                value: day_rollover_hour.to_string(),
            });
        }
        let max_batch_size = parse_var(&lookup, "STUDY_MAX_BATCH_SIZE", defaults.max_batch_size)?;
        if max_batch_size == 0 {
            return Err(ConfigError::Invalid {
                name: "STUDY_MAX_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            call_timeout: Duration::from_millis(timeout_ms),
            day_rollover_hour,
            max_batch_size,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    /// Context for `user` carrying the configured call timeout.
    pub fn request_context(&self, user: UserId) -> RequestContext {
        RequestContext::for_user(user).with_timeout(self.call_timeout)
    }
}
