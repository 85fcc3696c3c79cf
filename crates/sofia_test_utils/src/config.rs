//! Database configuration types for test infrastructure.

use std::fmt;

/// PostgreSQL versions available from `docker/docker-compose.yml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgVersion {
    Postgres15,
    Postgres16,
}

impl PgVersion {
    /// docker-compose service name.
    pub fn service_name(&self) -> &'static str {
        match self {
            PgVersion::Postgres15 => "postgres15",
            PgVersion::Postgres16 => "postgres16",
        }
    }

    /// Host port the service is published on.
    pub fn port(&self) -> u16 {
        match self {
            PgVersion::Postgres15 => 15433,
            PgVersion::Postgres16 => 15434,
        }
    }

    pub fn all() -> &'static [PgVersion] {
        &[PgVersion::Postgres15, PgVersion::Postgres16]
    }
}

impl fmt::Display for PgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgVersion::Postgres15 => write!(f, "PostgreSQL 15"),
            PgVersion::Postgres16 => write!(f, "PostgreSQL 16"),
        }
    }
}

/// Credentials for a test container.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub version: PgVersion,
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl TestDbConfig {
    pub fn new(version: PgVersion) -> Self {
        Self {
            version,
            host: "localhost".to_string(),
            database: "sofia_test".to_string(),
            username: "sofia".to_string(),
            password: "sofia_test".to_string(),
        }
    }

    /// Build a PostgreSQL connection string.
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username,
            self.password,
            self.host,
            self.version.port(),
            self.database
        )
    }

    /// The same settings as the `POSTGRES_*` variables the audit binary reads.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("POSTGRES_HOST", self.host.clone()),
            ("POSTGRES_PORT", self.version.port().to_string()),
            ("POSTGRES_DB", self.database.clone()),
            ("POSTGRES_USER", self.username.clone()),
            ("POSTGRES_PASSWORD", self.password.clone()),
        ]
    }
}
