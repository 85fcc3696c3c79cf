//! Collector health classification.

use serde::{Deserialize, Serialize};
use sofia_db::DbTableStatus;
use std::fmt;

use crate::types::{RegistryStatus, ScheduleStatus};
use crate::usage::AnalyticsUsage;

/// Overall wiring health of one collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// Registered, scheduled, has data, and something reads it.
    Pass,
    /// Registered and scheduled with data, but no consumer.
    Partial,
    /// Registered and scheduled, but no destination holds rows.
    Dead,
    /// Not registered, or registered without a schedule.
    Orphan,
    /// Reserved; no current rule produces it.
    Mismatch,
}

impl OverallStatus {
    pub const ALL: [OverallStatus; 5] = [
        OverallStatus::Pass,
        OverallStatus::Partial,
        OverallStatus::Dead,
        OverallStatus::Orphan,
        OverallStatus::Mismatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Pass => "PASS",
            OverallStatus::Partial => "PARTIAL",
            OverallStatus::Dead => "DEAD",
            OverallStatus::Orphan => "ORPHAN",
            OverallStatus::Mismatch => "MISMATCH",
        }
    }

    /// Triage order for reports: most severe first.
    pub fn severity_rank(self) -> u8 {
        match self {
            OverallStatus::Dead => 0,
            OverallStatus::Mismatch => 1,
            OverallStatus::Partial => 2,
            OverallStatus::Orphan => 3,
            OverallStatus::Pass => 4,
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply the rules in order; the first that holds decides.
pub fn classify(
    registry: RegistryStatus,
    schedule: ScheduleStatus,
    db_status: &[DbTableStatus],
    usage: &AnalyticsUsage,
) -> OverallStatus {
    if !registry.is_registered() || schedule == ScheduleStatus::Unscheduled {
        return OverallStatus::Orphan;
    }

    let scheduled = schedule == ScheduleStatus::Scheduled;
    let has_data = db_status.iter().any(DbTableStatus::has_data);

    if scheduled && !has_data {
        return OverallStatus::Dead;
    }
    if scheduled && usage.is_consumed() {
        return OverallStatus::Pass;
    }
    OverallStatus::Partial
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumed() -> AnalyticsUsage {
        AnalyticsUsage {
            used_by_primary_aggregator: true,
            ..Default::default()
        }
    }

    fn populated() -> Vec<DbTableStatus> {
        vec![DbTableStatus::present("sofia.analytics_events", 10_000)]
    }

    #[test]
    fn test_unregistered_is_orphan_regardless_of_data() {
        let status = classify(
            RegistryStatus::Unregistered,
            ScheduleStatus::Scheduled,
            &populated(),
            &consumed(),
        );
        assert_eq!(status, OverallStatus::Orphan);
    }

    #[test]
    fn test_unscheduled_is_orphan() {
        let status = classify(
            RegistryStatus::RegisteredLegacy,
            ScheduleStatus::Unscheduled,
            &populated(),
            &consumed(),
        );
        assert_eq!(status, OverallStatus::Orphan);
    }

    #[test]
    fn test_scheduled_without_rows_is_dead() {
        let empty = vec![
            DbTableStatus::present("sofia.analytics_events", 0),
            DbTableStatus::missing("sofia.other"),
        ];
        let status = classify(
            RegistryStatus::RegisteredPrimary,
            ScheduleStatus::Scheduled,
            &empty,
            &consumed(),
        );
        assert_eq!(status, OverallStatus::Dead);
        assert_eq!(
            classify(
                RegistryStatus::RegisteredPrimary,
                ScheduleStatus::Scheduled,
                &[],
                &consumed()
            ),
            OverallStatus::Dead
        );
    }

    #[test]
    fn test_scheduled_with_data_and_consumer_passes() {
        let status = classify(
            RegistryStatus::RegisteredPrimary,
            ScheduleStatus::Scheduled,
            &populated(),
            &consumed(),
        );
        assert_eq!(status, OverallStatus::Pass);

        let insights_only = AnalyticsUsage {
            used_by_insights_pipeline: true,
            ..Default::default()
        };
        assert_eq!(
            classify(
                RegistryStatus::RegisteredLegacy,
                ScheduleStatus::Scheduled,
                &populated(),
                &insights_only
            ),
            OverallStatus::Pass
        );
    }

    #[test]
    fn test_unconsumed_data_is_partial() {
        let status = classify(
            RegistryStatus::RegisteredPrimary,
            ScheduleStatus::Scheduled,
            &populated(),
            &AnalyticsUsage::default(),
        );
        assert_eq!(status, OverallStatus::Partial);
    }

    #[test]
    fn test_unknown_schedule_falls_through_to_partial() {
        let status = classify(
            RegistryStatus::RegisteredPrimary,
            ScheduleStatus::Unknown,
            &[],
            &consumed(),
        );
        assert_eq!(status, OverallStatus::Partial);
    }

    #[test]
    fn test_never_mismatch() {
        for registry in [
            RegistryStatus::RegisteredPrimary,
            RegistryStatus::RegisteredLegacy,
            RegistryStatus::Unregistered,
        ] {
            for schedule in [
                ScheduleStatus::Scheduled,
                ScheduleStatus::Unscheduled,
                ScheduleStatus::Unknown,
            ] {
                for db in [vec![], populated()] {
                    for usage in [AnalyticsUsage::default(), consumed()] {
                        assert_ne!(
                            classify(registry, schedule, &db, &usage),
                            OverallStatus::Mismatch
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_serializes_screaming() {
        assert_eq!(serde_json::to_value(OverallStatus::Pass).unwrap(), "PASS");
        assert_eq!(serde_json::to_value(OverallStatus::Orphan).unwrap(), "ORPHAN");
    }
}
