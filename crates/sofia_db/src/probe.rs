//! Catalog probes for destination tables.
//!
//! For each table: existence from `information_schema.tables`, an
//! unconditional `COUNT(*)`, then the first candidate timestamp column that
//! exists and has a non-null `MAX`. Failures are folded into the returned
//! [`DbTableStatus`] so one bad table never aborts an audit.

use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DbError, Result};
use crate::sql_guard::{quote_ident, validate_read_only};
use crate::types::{DbTableStatus, QualifiedTable, DEFAULT_SCHEMA};

const TABLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = $1 AND table_name = $2)";

const TABLE_COLUMNS_SQL: &str = "SELECT column_name::text FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2";

/// Candidate freshness columns, tried in order.
pub const DEFAULT_TIMESTAMP_CANDIDATES: &[&str] = &[
    "collected_at",
    "created_at",
    "updated_at",
    "inserted_at",
    "fetched_at",
    "scraped_at",
    "published_at",
    "published_date",
    "snapshot_date",
    "date",
];

/// Probe tuning shared by every table.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub default_schema: String,
    pub timestamp_candidates: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            default_schema: DEFAULT_SCHEMA.to_string(),
            timestamp_candidates: DEFAULT_TIMESTAMP_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Source of live table state.
pub trait TableProbe {
    /// Trivial round trip used once at audit start.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Inspect one table. Never fails; errors land in the status.
    fn probe_table(&self, table: &str) -> impl Future<Output = DbTableStatus> + Send;
}

/// [`TableProbe`] backed by the PostgreSQL catalog.
#[derive(Clone)]
pub struct CatalogProber {
    pool: PgPool,
    config: ProbeConfig,
    ping_timeout: Duration,
}

impl CatalogProber {
    pub fn new(pool: PgPool, config: ProbeConfig, ping_timeout: Duration) -> Self {
        Self {
            pool,
            config,
            ping_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn try_probe(&self, table: &QualifiedTable) -> Result<DbTableStatus> {
        let name = table.to_string();

        let exists: bool = sqlx::query_scalar(TABLE_EXISTS_SQL)
            .bind(&table.schema)
            .bind(&table.table)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            debug!(table = %name, "Table not found in catalog");
            return Ok(DbTableStatus::missing(name));
        }

        let count_sql = guarded(format!("SELECT COUNT(*) FROM {}", table.quoted()))?;
        let row_count: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await?;
        let status = DbTableStatus::present(name.as_str(), row_count);

        let columns: Vec<String> = sqlx::query_scalar(TABLE_COLUMNS_SQL)
            .bind(&table.schema)
            .bind(&table.table)
            .fetch_all(&self.pool)
            .await?;

        for candidate in &self.config.timestamp_candidates {
            if !columns.iter().any(|column| column == candidate) {
                continue;
            }
            let max_sql = guarded(format!(
                "SELECT MAX({})::text FROM {}",
                quote_ident(candidate),
                table.quoted()
            ))?;
            let latest: Option<String> = sqlx::query_scalar(&max_sql)
                .fetch_one(&self.pool)
                .await?;
            if let Some(value) = latest {
                return Ok(status.with_last_update(candidate.as_str(), value));
            }
        }

        Ok(status)
    }
}

impl TableProbe for CatalogProber {
    async fn ping(&self) -> Result<()> {
        match tokio::time::timeout(self.ping_timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DbError::unavailable(e.to_string())),
            Err(_) => Err(DbError::unavailable(format!(
                "no response within {}s",
                self.ping_timeout.as_secs()
            ))),
        }
    }

    async fn probe_table(&self, table: &str) -> DbTableStatus {
        let qualified = QualifiedTable::parse(table, &self.config.default_schema);
        match self.try_probe(&qualified).await {
            Ok(status) => status,
            Err(e) => {
                warn!(table = %qualified, error = %e, "Table probe failed");
                DbTableStatus::failed(qualified.to_string(), e.to_string())
            }
        }
    }
}

fn guarded(sql: String) -> Result<String> {
    validate_read_only(&sql)?;
    Ok(sql)
}
