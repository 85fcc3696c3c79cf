//! Read-only PostgreSQL access for the collector audit.
//!
//! This crate owns everything that touches the database: connection
//! settings, the shared pool, the read-only statement guard, and the
//! catalog prober that reports existence, row counts and freshness of
//! destination tables.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sofia_db::{create_pool, CatalogProber, DbConfig, ProbeConfig, TableProbe};
//!
//! let config = DbConfig::from_env()?;
//! let prober = CatalogProber::new(create_pool(&config), ProbeConfig::default(), config.connect_timeout);
//!
//! if prober.ping().await.is_ok() {
//!     let status = prober.probe_table("sofia.analytics_events").await;
//! }
//! ```

mod error;
mod pool;
pub mod probe;
pub mod sql_guard;
mod types;

pub use error::{DbError, Result};
pub use pool::{create_pool, DbConfig};
pub use probe::{CatalogProber, ProbeConfig, TableProbe, DEFAULT_TIMESTAMP_CANDIDATES};
pub use types::{DbTableStatus, QualifiedTable, DEFAULT_SCHEMA};
