//! Service configuration loaded from environment variables.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::canvas::CANVAS_BASE_URL;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// SQLite database file (`:memory:` for a throwaway database)
    pub database_path: String,
    /// Canvas API base URL
    pub canvas_base: String,
    /// Identity provider base URL
    pub supabase_url: String,
    /// Public API key sent alongside user tokens
    pub supabase_anon_key: String,
    /// Fernet key used to encrypt stored Canvas tokens
    pub fernet_key: String,
    /// Timeout for each call to Canvas or the identity provider
    pub upstream_timeout: Duration,
    /// How long a database call waits on a locked database
    pub db_busy_timeout: Duration,
    /// How long a verified bearer token is trusted without asking the provider again
    pub auth_cache_ttl: Duration,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing { name })
        };
        let optional = |name: &'static str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| {
                    info!("{name} not set, using default: {default}");
                    default.to_string()
                })
        };

        Ok(Self {
            bind_address: optional("BIND_ADDRESS", "0.0.0.0:8010"),
            database_path: optional("DATABASE_PATH", "classmate.db"),
            canvas_base: optional("CANVAS_BASE", CANVAS_BASE_URL),
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            fernet_key: required("FERNET_KEY")?,
            upstream_timeout: Duration::from_secs(parse(
                "UPSTREAM_TIMEOUT_SECS",
                &optional("UPSTREAM_TIMEOUT_SECS", "25"),
            )?),
            db_busy_timeout: Duration::from_millis(parse(
                "DB_BUSY_TIMEOUT_MS",
                &optional("DB_BUSY_TIMEOUT_MS", "5000"),
            )?),
            auth_cache_ttl: Duration::from_secs(parse(
                "AUTH_CACHE_TTL_SECS",
                &optional("AUTH_CACHE_TTL_SECS", "60"),
            )?),
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SUPABASE_URL", "https://x.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("FERNET_KEY", "key"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8010");
        assert_eq!(config.canvas_base, CANVAS_BASE_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(25));
        assert_eq!(config.db_busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.auth_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing { name: "FERNET_KEY" });
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("UPSTREAM_TIMEOUT_SECS", "soon"));

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "UPSTREAM_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
