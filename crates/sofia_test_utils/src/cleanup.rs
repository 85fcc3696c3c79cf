//! Schema-per-test isolation.

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// RAII guard owning a uniquely named schema.
///
/// Audit probes address tables as `schema.table`, so tests create their
/// fixtures with [`PostgresTestGuard::qualified`] names and point the prober
/// at them. The schema is dropped (CASCADE) when the guard goes away.
///
/// ```rust,ignore
/// let guard = PostgresTestGuard::new(pool.pool.clone()).await.unwrap();
/// let events = guard.qualified("analytics_events");
/// guard.execute(&format!("CREATE TABLE {events} (id INT, collected_at TIMESTAMPTZ)")).await.unwrap();
/// ```
pub struct PostgresTestGuard {
    pool: PgPool,
    schema_name: String,
}

impl PostgresTestGuard {
    pub async fn new(pool: PgPool) -> Result<Self> {
        let schema_name = format!("audit_test_{}", Uuid::new_v4().simple());
        debug!("Creating test schema: {}", schema_name);

        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await?;

        Ok(Self { pool, schema_name })
    }

    /// `<schema>.<table>` inside the isolated schema.
    pub fn qualified(&self, table: &str) -> String {
        format!("{}.{}", self.schema_name, table)
    }

    pub async fn execute(&self, query: &str) -> Result<()> {
        sqlx::query(query).execute(&self.pool).await?;
        Ok(())
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop the schema now instead of waiting for `Drop`.
    pub async fn cleanup(&self) -> Result<()> {
        debug!("Dropping test schema: {}", self.schema_name);
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema_name))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Drop for PostgresTestGuard {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let schema_name = self.schema_name.clone();

        // No async in Drop: hand the statement to the current runtime if any
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let sql = format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name);
                if let Err(e) = sqlx::query(&sql).execute(&pool).await {
                    warn!("Failed to drop test schema {}: {}", schema_name, e);
                }
            });
        } else {
            warn!(
                "Not in async context, cannot cleanup schema: {}",
                self.schema_name
            );
        }
    }
}
