//! Audit record and report types.
//!
//! These are what the JSON artifact serializes, field for field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sofia_db::DbTableStatus;
use std::fmt;

use crate::classify::OverallStatus;
use crate::destinations::DestinationTable;
use crate::gate::CoreHealthGate;
use crate::mock::MockFlags;
use crate::registry::RegistrySource;
use crate::usage::AnalyticsUsage;

/// Bumped whenever the JSON layout changes shape.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Prefix for collectors found on disk but absent from every registry.
pub const UNREGISTERED_PREFIX: &str = "unregistered::";

/// Implementation track of a collector source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Primary,
    Legacy,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Primary => write!(f, "primary"),
            Track::Legacy => write!(f, "legacy"),
        }
    }
}

/// Where (if anywhere) a collector is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    RegisteredPrimary,
    RegisteredLegacy,
    Unregistered,
}

impl RegistryStatus {
    pub fn is_registered(self) -> bool {
        !matches!(self, RegistryStatus::Unregistered)
    }
}

impl fmt::Display for RegistryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryStatus::RegisteredPrimary => write!(f, "registered_primary"),
            RegistryStatus::RegisteredLegacy => write!(f, "registered_legacy"),
            RegistryStatus::Unregistered => write!(f, "unregistered"),
        }
    }
}

/// Whether the registry carries a run schedule for the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Unscheduled,
    /// Registered without schedule metadata (dispatch-only collectors).
    Unknown,
}

impl ScheduleStatus {
    /// Status implied by an optional registry schedule string.
    pub fn from_schedule(schedule: Option<&str>) -> Self {
        match schedule {
            Some(s) if !s.trim().is_empty() => ScheduleStatus::Scheduled,
            Some(_) => ScheduleStatus::Unscheduled,
            None => ScheduleStatus::Unknown,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Scheduled => write!(f, "scheduled"),
            ScheduleStatus::Unscheduled => write!(f, "unscheduled"),
            ScheduleStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Everything learned about one collector in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorAuditRecord {
    pub identity: String,
    pub track: Track,
    /// Relative to the project root, `/`-separated.
    pub source_path: Option<String>,
    pub registry_status: RegistryStatus,
    pub schedule_status: ScheduleStatus,
    pub schedule: Option<String>,
    pub destinations: Vec<DestinationTable>,
    pub db_status: Vec<DbTableStatus>,
    pub analytics_usage: AnalyticsUsage,
    pub mock_flags: MockFlags,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCounts {
    pub registered_primary: usize,
    pub registered_legacy: usize,
    pub unregistered: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCounts {
    pub scheduled: usize,
    pub unscheduled: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusCounts {
    pub pass: usize,
    pub partial: usize,
    pub dead: usize,
    pub orphan: usize,
    pub mismatch: usize,
}

impl StatusCounts {
    pub fn get(&self, status: OverallStatus) -> usize {
        match status {
            OverallStatus::Pass => self.pass,
            OverallStatus::Partial => self.partial,
            OverallStatus::Dead => self.dead,
            OverallStatus::Orphan => self.orphan,
            OverallStatus::Mismatch => self.mismatch,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCounts {
    pub primary: usize,
    pub legacy: usize,
}

/// Tallies over the classified set plus the core health gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_collectors: usize,
    pub by_registry: RegistryCounts,
    pub by_schedule: ScheduleCounts,
    pub by_status: StatusCounts,
    pub by_track: TrackCounts,
    pub mock_detected: usize,
    pub core_health: CoreHealthGate,
}

/// Top-level audit output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub schema_version: String,
    pub database_available: bool,
    pub summary: AuditSummary,
    pub registry_sources: Vec<RegistrySource>,
    pub collectors: Vec<CollectorAuditRecord>,
}

impl AuditReport {
    pub fn non_pass(&self) -> impl Iterator<Item = &CollectorAuditRecord> {
        self.collectors
            .iter()
            .filter(|r| r.overall_status != OverallStatus::Pass)
    }

    pub fn with_status(&self, status: OverallStatus) -> impl Iterator<Item = &CollectorAuditRecord> {
        self.collectors
            .iter()
            .filter(move |r| r.overall_status == status)
    }
}
