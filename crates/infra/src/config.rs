//! Store configuration loaded from the environment.

use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

/// Which backend the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    /// Process-local store for dev/test. Nothing survives a restart.
    Memory,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Connection and sequencing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Full connection URL; overrides the individual parts when set.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub connect_retries: u32,
    pub retry_interval: Duration,
    /// First order number handed out by a fresh sequence.
    pub order_number_base: i64,
}

pub const DEFAULT_ORDER_NUMBER_BASE: i64 = 1000;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "appdb".to_string(),
            user: "appuser".to_string(),
            password: String::new(),
            database_url: None,
            max_connections: 5,
            connect_retries: 12,
            retry_interval: Duration::from_secs(5),
            order_number_base: DEFAULT_ORDER_NUMBER_BASE,
        }
    }
}

impl StoreConfig {
    /// Read settings from the process environment.
    ///
    /// Callers that want `.env` support load it first (`dotenvy::dotenv()`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("STOCKGUARD_BACKEND").as_deref().map(str::trim) {
            None | Some("postgres") => Backend::Postgres,
            Some("memory") => Backend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STOCKGUARD_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            backend,
            host: get("DB_HOST").unwrap_or(defaults.host),
            port: parse_or(get("DB_PORT"), "DB_PORT", defaults.port)?,
            database: get("POSTGRES_DB")
                .or_else(|| get("DB_NAME"))
                .unwrap_or(defaults.database),
            user: get("POSTGRES_USER").unwrap_or(defaults.user),
            password: get("POSTGRES_PASSWORD").unwrap_or(defaults.password),
            database_url: get("DATABASE_URL"),
            max_connections: parse_or(
                get("DB_MAX_CONNECTIONS"),
                "DB_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,
            connect_retries: parse_or(
                get("DB_CONNECT_RETRIES"),
                "DB_CONNECT_RETRIES",
                defaults.connect_retries,
            )?,
            retry_interval: Duration::from_secs(parse_or(
                get("DB_RETRY_SECONDS"),
                "DB_RETRY_SECONDS",
                defaults.retry_interval.as_secs(),
            )?),
            order_number_base: parse_or(
                get("ORDER_NUMBER_BASE"),
                "ORDER_NUMBER_BASE",
                defaults.order_number_base,
            )?,
        })
    }

    /// Postgres connection options.
    ///
    /// `DATABASE_URL` is parsed as-is. Otherwise the parts are set one by one,
    /// so credentials containing `@`, `/`, `#` or `:` need no escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.database_url {
            return url.parse().map_err(|_| ConfigError::Invalid {
                var: "DATABASE_URL",
                value: url.clone(),
            });
        }
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);
        Ok(if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        })
    }
}

fn parse_or<T: core::str::FromStr>(
    raw: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = from_map(&[]).unwrap();
        assert_eq!(cfg, StoreConfig::default());
        let options = cfg.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "appuser");
        assert_eq!(options.get_database(), Some("appdb"));
    }

    #[test]
    fn parts_and_url_override() {
        let cfg = from_map(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "shop"),
            ("POSTGRES_USER", "svc"),
            ("POSTGRES_PASSWORD", "pw"),
            ("DB_CONNECT_RETRIES", "3"),
            ("DB_RETRY_SECONDS", "1"),
            ("ORDER_NUMBER_BASE", "5000"),
        ])
        .unwrap();
        let options = cfg.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "svc");
        assert_eq!(options.get_database(), Some("shop"));
        assert_eq!(cfg.connect_retries, 3);
        assert_eq!(cfg.retry_interval, Duration::from_secs(1));
        assert_eq!(cfg.order_number_base, 5000);

        let cfg = from_map(&[
            ("DATABASE_URL", "postgres://u@x:7000/y"),
            ("POSTGRES_DB", "ignored"),
        ])
        .unwrap();
        let options = cfg.connect_options().unwrap();
        assert_eq!(options.get_host(), "x");
        assert_eq!(options.get_port(), 7000);
        assert_eq!(options.get_database(), Some("y"));
    }

    #[test]
    fn reserved_characters_in_credentials_keep_the_host() {
        let cfg = from_map(&[
            ("DB_HOST", "db"),
            ("POSTGRES_USER", "ops:team@corp"),
            ("POSTGRES_PASSWORD", "p@ss/w#rd:1"),
        ])
        .unwrap();
        let options = cfg.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "ops:team@corp");
        assert_eq!(options.get_database(), Some("appdb"));
    }

    #[test]
    fn malformed_database_url_is_a_config_error() {
        let cfg = from_map(&[("DATABASE_URL", "not a url")]).unwrap();
        assert!(matches!(
            cfg.connect_options(),
            Err(ConfigError::Invalid { var: "DATABASE_URL", .. })
        ));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = from_map(&[("DB_PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "DB_PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn backend_selection() {
        let cfg = from_map(&[("STOCKGUARD_BACKEND", "memory")]).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
        assert!(from_map(&[("STOCKGUARD_BACKEND", "sqlite")]).is_err());
    }
}
