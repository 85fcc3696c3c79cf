//! Summary tallies and the core health gate.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::OverallStatus;
use crate::config::CoreGateConfig;
use crate::types::{
    AuditSummary, CollectorAuditRecord, RegistryCounts, RegistryStatus, ScheduleCounts,
    ScheduleStatus, StatusCounts, Track, TrackCounts,
};

pub const DATABASE_UNAVAILABLE_REASON: &str =
    "database unavailable: destination tables could not be probed";

/// Outcome of one core source pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSourceCheck {
    pub pattern: String,
    pub matched: Vec<String>,
    /// At least one matched collector is not ORPHAN.
    pub healthy: bool,
}

/// Whether the primary aggregator names a core table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTableCheck {
    pub table: String,
    pub referenced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreHealthGate {
    pub passed: bool,
    pub failures: Vec<String>,
    pub sources: Vec<CoreSourceCheck>,
    pub tables: Vec<CoreTableCheck>,
}

/// Pattern that tries a regex and degrades to substring search.
enum IdentityMatcher {
    Regex(regex::Regex),
    Substring(String),
}

impl IdentityMatcher {
    fn new(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => IdentityMatcher::Regex(re),
            Err(e) => {
                warn!(pattern, error = %e, "core pattern is not a valid regex, using substring match");
                IdentityMatcher::Substring(pattern.to_lowercase())
            }
        }
    }

    fn is_match(&self, identity: &str) -> bool {
        match self {
            IdentityMatcher::Regex(re) => re.is_match(identity),
            IdentityMatcher::Substring(s) => identity.to_lowercase().contains(s.as_str()),
        }
    }
}

/// Evaluate the gate over classified records.
pub fn evaluate_core_gate(
    config: &CoreGateConfig,
    records: &[CollectorAuditRecord],
    primary_aggregator_text: &str,
    database_available: bool,
) -> CoreHealthGate {
    let mut failures = Vec::new();

    if !database_available {
        failures.push(DATABASE_UNAVAILABLE_REASON.to_string());
    }

    let mut sources = Vec::with_capacity(config.source_patterns.len());
    for pattern in &config.source_patterns {
        let matcher = IdentityMatcher::new(pattern);
        let matched: Vec<&CollectorAuditRecord> = records
            .iter()
            .filter(|r| matcher.is_match(&r.identity))
            .collect();
        let healthy = matched
            .iter()
            .any(|r| r.overall_status != OverallStatus::Orphan);

        if matched.is_empty() {
            failures.push(format!("core source '{}' matches no collector", pattern));
        } else if !healthy {
            failures.push(format!(
                "core source '{}' matches only ORPHAN collectors ({})",
                pattern,
                matched
                    .iter()
                    .map(|r| r.identity.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        sources.push(CoreSourceCheck {
            pattern: pattern.clone(),
            matched: matched.iter().map(|r| r.identity.clone()).collect(),
            healthy,
        });
    }

    let aggregator = primary_aggregator_text.to_lowercase();
    let tables: Vec<CoreTableCheck> = config
        .tables
        .iter()
        .map(|table| CoreTableCheck {
            table: table.clone(),
            referenced: aggregator.contains(&table.to_lowercase()),
        })
        .collect();
    for check in tables.iter().filter(|c| !c.referenced) {
        failures.push(format!(
            "core table '{}' is not referenced by the primary aggregator",
            check.table
        ));
    }

    CoreHealthGate {
        passed: failures.is_empty(),
        failures,
        sources,
        tables,
    }
}

/// Tally records and attach the gate.
pub fn summarize(records: &[CollectorAuditRecord], core_health: CoreHealthGate) -> AuditSummary {
    let mut by_registry = RegistryCounts::default();
    let mut by_schedule = ScheduleCounts::default();
    let mut by_status = StatusCounts::default();
    let mut by_track = TrackCounts::default();
    let mut mock_detected = 0;

    for record in records {
        match record.registry_status {
            RegistryStatus::RegisteredPrimary => by_registry.registered_primary += 1,
            RegistryStatus::RegisteredLegacy => by_registry.registered_legacy += 1,
            RegistryStatus::Unregistered => by_registry.unregistered += 1,
        }
        match record.schedule_status {
            ScheduleStatus::Scheduled => by_schedule.scheduled += 1,
            ScheduleStatus::Unscheduled => by_schedule.unscheduled += 1,
            ScheduleStatus::Unknown => by_schedule.unknown += 1,
        }
        match record.overall_status {
            OverallStatus::Pass => by_status.pass += 1,
            OverallStatus::Partial => by_status.partial += 1,
            OverallStatus::Dead => by_status.dead += 1,
            OverallStatus::Orphan => by_status.orphan += 1,
            OverallStatus::Mismatch => by_status.mismatch += 1,
        }
        match record.track {
            Track::Primary => by_track.primary += 1,
            Track::Legacy => by_track.legacy += 1,
        }
        if record.mock_flags.mock_detected {
            mock_detected += 1;
        }
    }

    AuditSummary {
        total_collectors: records.len(),
        by_registry,
        by_schedule,
        by_status,
        by_track,
        mock_detected,
        core_health,
    }
}
