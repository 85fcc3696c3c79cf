//! PostgreSQL test pool factory.

use crate::config::{PgVersion, TestDbConfig};
use crate::containers::lifecycle::ensure_container_running;
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// A pool against a running test container.
#[derive(Debug, Clone)]
pub struct TestPgPool {
    pub pool: PgPool,
    pub config: TestDbConfig,
}

impl TestPgPool {
    /// Ensure the container for `version` is up, then connect.
    ///
    /// ```rust,ignore
    /// let pool = TestPgPool::new(PgVersion::Postgres16).await.unwrap();
    /// pool.execute("SELECT 1").await.unwrap();
    /// ```
    pub async fn new(version: PgVersion) -> Result<Self> {
        ensure_container_running(version).await?;

        let config = TestDbConfig::new(version);
        info!("Creating PostgreSQL pool for {} on port {}", version, version.port());

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.connection_string())
            .await?;

        Ok(Self { pool, config })
    }

    /// Execute a statement that doesn't return rows.
    pub async fn execute(&self, query: &str) -> Result<()> {
        sqlx::query(query).execute(&self.pool).await?;
        Ok(())
    }
}
