//! Environment-derived configuration for the perk directory harness.

use std::time::Duration;

use thiserror::Error;

pub const ENV_API_BASE_URL: &str = "PERKDIR_API_BASE_URL";
pub const ENV_DATABASE_URI: &str = "MONGO_URI";
pub const ENV_SIGNING_SECRET: &str = "JWT_SECRET";
pub const ENV_CLEANUP_SHELL: &str = "PERKDIR_CLEANUP_SHELL";
pub const ENV_DEBOUNCE_MS: &str = "PERKDIR_DEBOUNCE_MS";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:4000/api";
const DEFAULT_SIGNING_SECRET: &str = "integration-test-secret";
const DEFAULT_CLEANUP_SHELL: &str = "mongosh";
const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingRequired(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Resolved suite configuration. Construction enforces the fail-fast
/// precondition: without a database connection string the suite must not
/// touch the network at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub api_base_url: String,
    pub database_uri: String,
    pub signing_secret: String,
    pub cleanup_shell: String,
    pub debounce: Duration,
}

impl HarnessConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_uri = lookup(ENV_DATABASE_URI)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingRequired(ENV_DATABASE_URI))?;

        let api_base_url = normalize_base_url(
            lookup(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
        );
        let signing_secret = lookup(ENV_SIGNING_SECRET)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SIGNING_SECRET.to_owned());
        let cleanup_shell = lookup(ENV_CLEANUP_SHELL)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLEANUP_SHELL.to_owned());

        let debounce_ms = match lookup(ENV_DEBOUNCE_MS) {
            Some(raw) => {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        name: ENV_DEBOUNCE_MS,
                        value: raw,
                    })?
            }
            None => DEFAULT_DEBOUNCE_MS,
        };

        Ok(Self {
            api_base_url,
            database_uri,
            signing_secret,
            cleanup_shell,
            debounce: Duration::from_millis(debounce_ms),
        })
    }
}

fn normalize_base_url(raw: String) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}
