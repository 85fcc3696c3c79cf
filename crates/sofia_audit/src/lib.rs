//! Sofia collector ecosystem audit.
//!
//! Reconciles the declared collector registries with the collector sources on
//! disk, infers each collector's destination tables, checks them against the
//! live database and downstream consumers, and classifies every collector as
//! PASS, PARTIAL, DEAD, ORPHAN or MISMATCH. A core health gate over the
//! mandatory sources decides the process exit code.
//!
//! The engine never executes collectors and never writes to the database.

pub mod classify;
pub mod config;
pub mod destinations;
pub mod engine;
pub mod error;
pub mod gate;
pub mod mock;
pub mod patterns;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod source;
pub mod types;
pub mod usage;

pub use classify::{classify, OverallStatus};
pub use config::{AuditLayout, AuditSettings, CoreGateConfig, NamingConfig};
pub use destinations::{DestinationInferrer, DestinationTable, EvidenceTier, SourceLanguage};
pub use engine::{reconcile, run_audit, AuditEngine, ResolvedCollector};
pub use error::{AuditError, Result};
pub use gate::{evaluate_core_gate, summarize, CoreHealthGate};
pub use mock::{detect_mock, MockFlags};
pub use registry::{resolve_registry, Registry, RegistrySource};
pub use report::{write_reports, ReportPaths};
pub use scanner::{CollectorScanner, ScannedCollector};
pub use types::{
    AuditReport, AuditSummary, CollectorAuditRecord, RegistryStatus, ScheduleStatus, Track,
};
pub use usage::{AnalyticsUsage, ConsumerIndex};
