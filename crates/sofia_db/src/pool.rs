//! Connection settings and pool creation.
//!
//! Settings come from the environment with a fallback chain between the
//! `POSTGRES_*` and `DB_*` naming conventions. The first variable that is set
//! and non-empty wins.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, Result};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "sofia_db";
const DEFAULT_USER: &str = "sofia";
const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

const HOST_VARS: &[&str] = &["POSTGRES_HOST", "DB_HOST"];
const PORT_VARS: &[&str] = &["POSTGRES_PORT", "DB_PORT"];
const DATABASE_VARS: &[&str] = &["POSTGRES_DB", "DB_NAME"];
const USER_VARS: &[&str] = &["POSTGRES_USER", "DB_USER"];
const PASSWORD_VARS: &[&str] = &["POSTGRES_PASSWORD", "DB_PASSWORD"];
const TIMEOUT_VARS: &[&str] = &["SOFIA_DB_CONNECT_TIMEOUT_SECS"];

/// Database connection configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Maximum connections in the shared pool
    pub max_connections: u32,
    /// Upper bound on acquiring a connection, including the initial connect
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USER.to_string(),
            password: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.trim().is_empty())
        };

        let port = match first(PORT_VARS) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| DbError::invalid_config(format!("port '{}' is not a number", raw)))?,
            None => defaults.port,
        };

        let connect_timeout = match first(TIMEOUT_VARS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    DbError::invalid_config(format!("connect timeout '{}' is not a number", raw))
                })?,
            None => defaults.connect_timeout,
        };

        Ok(Self {
            host: first(HOST_VARS).unwrap_or(defaults.host),
            port,
            database: first(DATABASE_VARS).unwrap_or(defaults.database),
            username: first(USER_VARS).unwrap_or(defaults.username),
            password: first(PASSWORD_VARS).unwrap_or(defaults.password),
            max_connections: defaults.max_connections,
            connect_timeout,
        })
    }

    /// Set maximum connections.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username);
        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }
}

/// Create the shared pool without connecting.
///
/// Connections are opened on first use, so an unreachable server surfaces on
/// the first query (bounded by `connect_timeout`) rather than here.
pub fn create_pool(config: &DbConfig) -> PgPool {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        user = %config.username,
        "Configuring PostgreSQL pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_lazy_with(config.connect_options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "sofia_db");
        assert_eq!(config.username, "sofia");
        assert_eq!(config.password, "");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_postgres_vars_take_priority() {
        let config = DbConfig::from_lookup(lookup(&[
            ("POSTGRES_HOST", "pg.internal"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "analytics"),
            ("POSTGRES_USER", "auditor"),
            ("DB_PASSWORD", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "pg.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.database, "analytics");
        assert_eq!(config.username, "auditor");
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn test_empty_value_falls_through_chain() {
        let config =
            DbConfig::from_lookup(lookup(&[("POSTGRES_HOST", "  "), ("DB_HOST", "fallback")]))
                .unwrap();
        assert_eq!(config.host, "fallback");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = DbConfig::from_lookup(lookup(&[("POSTGRES_PORT", "fivefour")]));
        assert!(matches!(result, Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn test_timeout_override() {
        let config =
            DbConfig::from_lookup(lookup(&[("SOFIA_DB_CONNECT_TIMEOUT_SECS", "1")])).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DbConfig::from_lookup(lookup(&[("DB_PASSWORD", "hunter2")])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let config = DbConfig::default().with_max_connections(1);
        let pool = create_pool(&config);
        assert_eq!(pool.size(), 0);
    }
}
