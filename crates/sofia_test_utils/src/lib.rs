//! Test utilities for the collector audit.
//!
//! Docker-based PostgreSQL fixtures: a pool factory that brings the
//! container up on demand and a guard that isolates each test in its own
//! schema.
//!
//! # Features
//!
//! - `docker-tests`: enable tests that require Docker containers
//!
//! # Usage
//!
//! ```rust,ignore
//! use sofia_test_utils::{PgVersion, PostgresTestGuard, TestPgPool};
//!
//! #[tokio::test]
//! #[cfg(feature = "docker-tests")]
//! async fn probes_fixture_table() {
//!     let pool = TestPgPool::new(PgVersion::Postgres16).await.unwrap();
//!     let guard = PostgresTestGuard::new(pool.pool.clone()).await.unwrap();
//!     guard.execute(&format!("CREATE TABLE {} (id INT)", guard.qualified("events"))).await.unwrap();
//! }
//! ```

pub mod cleanup;
pub mod config;
pub mod containers;
pub mod pools;

pub use cleanup::PostgresTestGuard;
pub use config::{PgVersion, TestDbConfig};
pub use containers::lifecycle::{ensure_container_running, wait_for_healthy};
pub use pools::postgres::TestPgPool;
