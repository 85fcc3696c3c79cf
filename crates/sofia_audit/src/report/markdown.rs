//! Human-readable audit report.

use std::fmt::Write;

use crate::classify::OverallStatus;
use crate::error::Result;
use crate::types::{AuditReport, CollectorAuditRecord, RegistryStatus, ScheduleStatus};

const TOP_NON_PASS: usize = 20;

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / total as f64)
    }
}

/// One-line explanation of why a collector landed in its state.
pub(crate) fn diagnose(record: &CollectorAuditRecord) -> String {
    match record.overall_status {
        OverallStatus::Orphan => {
            if record.registry_status == RegistryStatus::Unregistered {
                "not declared in any registry".to_string()
            } else {
                "registered without a schedule".to_string()
            }
        }
        OverallStatus::Dead => {
            if record.destinations.is_empty() {
                "no destination tables inferred from source".to_string()
            } else if record.db_status.is_empty() {
                "destination tables not probed (database unavailable)".to_string()
            } else if record.db_status.iter().all(|s| !s.exists) {
                "no inferred destination table exists".to_string()
            } else {
                "destination tables exist but hold no rows".to_string()
            }
        }
        OverallStatus::Partial => {
            if record.schedule_status == ScheduleStatus::Unknown {
                "registered without schedule metadata".to_string()
            } else {
                "data present but no downstream consumer".to_string()
            }
        }
        OverallStatus::Mismatch => "registry and destination evidence disagree".to_string(),
        OverallStatus::Pass => "healthy".to_string(),
    }
}

pub fn render_markdown(report: &AuditReport) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, report)?;
    Ok(out)
}

fn write_report(out: &mut String, report: &AuditReport) -> std::fmt::Result {
    let summary = &report.summary;

    writeln!(out, "# Collector Ecosystem Audit")?;
    writeln!(out)?;
    writeln!(out, "- Generated: {}", report.generated_at.to_rfc3339())?;
    writeln!(out, "- Schema version: {}", report.schema_version)?;
    writeln!(
        out,
        "- Database: {}",
        if report.database_available {
            "available"
        } else {
            "UNAVAILABLE (tables not probed)"
        }
    )?;
    writeln!(out)?;

    writeln!(out, "## Usage")?;
    writeln!(out)?;
    writeln!(out, "Run `sofia_audit` from the project root (or set `SOFIA_AUDIT_ROOT`).")?;
    writeln!(
        out,
        "Database settings come from `POSTGRES_HOST`/`DB_HOST`, `POSTGRES_PORT`/`DB_PORT`, \
         `POSTGRES_DB`/`DB_NAME`, `POSTGRES_USER`/`DB_USER` and `POSTGRES_PASSWORD`/`DB_PASSWORD`."
    )?;
    writeln!(
        out,
        "Exit code is `0` when the core health gate passes and `1` otherwise. \
         The full record set is in `collector-audit.json` next to this file."
    )?;
    writeln!(out)?;

    writeln!(out, "## What PASS means")?;
    writeln!(out)?;
    writeln!(out, "A collector is **PASS** when all of the following hold:")?;
    writeln!(out)?;
    writeln!(out, "1. It is declared in the primary or legacy registry.")?;
    writeln!(out, "2. The registry gives it a non-empty schedule.")?;
    writeln!(out, "3. At least one table it writes to exists and holds rows.")?;
    writeln!(
        out,
        "4. A downstream consumer (primary aggregator, insights pipeline or analytics file) names that table."
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "**ORPHAN**: unregistered or unscheduled. **DEAD**: scheduled but no destination holds rows. \
         **PARTIAL**: anything else short of PASS. **MISMATCH**: reserved."
    )?;
    writeln!(out)?;

    writeln!(out, "## Executive Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Count |")?;
    writeln!(out, "|---|---:|")?;
    writeln!(out, "| Total collectors | {} |", summary.total_collectors)?;
    writeln!(out, "| Registered (primary) | {} |", summary.by_registry.registered_primary)?;
    writeln!(out, "| Registered (legacy) | {} |", summary.by_registry.registered_legacy)?;
    writeln!(out, "| Unregistered | {} |", summary.by_registry.unregistered)?;
    writeln!(out, "| Scheduled | {} |", summary.by_schedule.scheduled)?;
    writeln!(out, "| Unscheduled | {} |", summary.by_schedule.unscheduled)?;
    writeln!(out, "| Schedule unknown | {} |", summary.by_schedule.unknown)?;
    writeln!(out, "| Primary track | {} |", summary.by_track.primary)?;
    writeln!(out, "| Legacy track | {} |", summary.by_track.legacy)?;
    writeln!(out, "| Mock detected | {} |", summary.mock_detected)?;
    writeln!(out)?;
    writeln!(out, "### Status distribution")?;
    writeln!(out)?;
    writeln!(out, "| Status | Count | Share |")?;
    writeln!(out, "|---|---:|---:|")?;
    for status in OverallStatus::ALL {
        let count = summary.by_status.get(status);
        writeln!(
            out,
            "| {} | {} | {} |",
            status,
            count,
            percent(count, summary.total_collectors)
        )?;
    }
    writeln!(out)?;

    let gate = &summary.core_health;
    writeln!(out, "## Core Health Gate")?;
    writeln!(out)?;
    if gate.passed {
        writeln!(out, "**PASSED**")?;
    } else {
        writeln!(out, "**FAILED**")?;
        writeln!(out)?;
        for reason in &gate.failures {
            writeln!(out, "- {}", reason)?;
        }
    }
    writeln!(out)?;
    if !gate.sources.is_empty() {
        writeln!(out, "| Core source | Matched collectors | Healthy |")?;
        writeln!(out, "|---|---|---|")?;
        for check in &gate.sources {
            let matched = if check.matched.is_empty() {
                "-".to_string()
            } else {
                check.matched.join(", ")
            };
            writeln!(
                out,
                "| `{}` | {} | {} |",
                cell(&check.pattern),
                cell(&matched),
                if check.healthy { "yes" } else { "no" }
            )?;
        }
        writeln!(out)?;
    }
    if !gate.tables.is_empty() {
        writeln!(out, "| Core table | Referenced by primary aggregator |")?;
        writeln!(out, "|---|---|")?;
        for check in &gate.tables {
            writeln!(
                out,
                "| `{}` | {} |",
                cell(&check.table),
                if check.referenced { "yes" } else { "no" }
            )?;
        }
        writeln!(out)?;
    }

    let mut non_pass: Vec<&CollectorAuditRecord> = report.non_pass().collect();
    non_pass.sort_by(|a, b| {
        a.overall_status
            .severity_rank()
            .cmp(&b.overall_status.severity_rank())
            .then_with(|| a.identity.cmp(&b.identity))
    });
    writeln!(
        out,
        "## Top {} non-PASS collectors ({} total)",
        TOP_NON_PASS,
        non_pass.len()
    )?;
    writeln!(out)?;
    if non_pass.is_empty() {
        writeln!(out, "None.")?;
        writeln!(out)?;
    }
    for record in non_pass.iter().take(TOP_NON_PASS) {
        write_diagnostics(out, record)?;
    }

    let orphans: Vec<&CollectorAuditRecord> = report.with_status(OverallStatus::Orphan).collect();
    writeln!(out, "## ORPHAN collectors ({})", orphans.len())?;
    writeln!(out)?;
    if orphans.is_empty() {
        writeln!(out, "None.")?;
    } else {
        writeln!(out, "| Collector | Registry | Schedule | Source |")?;
        writeln!(out, "|---|---|---|---|")?;
        for record in orphans {
            writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                cell(&record.identity),
                record.registry_status,
                record.schedule_status,
                cell(record.source_path.as_deref().unwrap_or("-"))
            )?;
        }
    }
    writeln!(out)?;

    let mocked: Vec<&CollectorAuditRecord> = report
        .collectors
        .iter()
        .filter(|r| r.mock_flags.mock_detected)
        .collect();
    writeln!(out, "## Mock detected ({})", mocked.len())?;
    writeln!(out)?;
    if mocked.is_empty() {
        writeln!(out, "None.")?;
        writeln!(out)?;
    }
    for record in mocked {
        writeln!(out, "- `{}`", record.identity)?;
        for line in &record.mock_flags.evidence_lines {
            writeln!(out, "  - `{}`", line.replace('`', "'"))?;
        }
    }
    if summary.mock_detected > 0 {
        writeln!(out)?;
    }

    writeln!(out, "## Registry sources")?;
    writeln!(out)?;
    writeln!(out, "| Path | Kind | Readable | Entries |")?;
    writeln!(out, "|---|---|---|---:|")?;
    for source in &report.registry_sources {
        writeln!(
            out,
            "| `{}` | {} | {} | {} |",
            cell(&source.path),
            source.kind,
            if source.readable { "yes" } else { "no" },
            source.entries
        )?;
    }

    Ok(())
}

fn write_diagnostics(out: &mut String, record: &CollectorAuditRecord) -> std::fmt::Result {
    writeln!(out, "### `{}`: {}", record.identity, record.overall_status)?;
    writeln!(out)?;
    writeln!(out, "- Diagnosis: {}", diagnose(record))?;
    writeln!(
        out,
        "- Registry: {} ({} track)",
        record.registry_status, record.track
    )?;
    match &record.schedule {
        Some(s) if !s.trim().is_empty() => writeln!(out, "- Schedule: `{}`", s)?,
        _ => writeln!(out, "- Schedule: {}", record.schedule_status)?,
    }
    writeln!(
        out,
        "- Source: {}",
        record.source_path.as_deref().unwrap_or("not found")
    )?;
    if record.destinations.is_empty() {
        writeln!(out, "- Destinations: none inferred")?;
    } else {
        let list = record
            .destinations
            .iter()
            .map(|d| format!("`{}` ({:.1}, {})", d.table, d.confidence, d.method))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "- Destinations: {}", list)?;
    }
    for status in &record.db_status {
        let detail = match (&status.error, status.exists) {
            (Some(err), _) => format!("error: {}", err),
            (None, false) => "missing".to_string(),
            (None, true) => {
                let mut s = format!("{} rows", status.row_count.unwrap_or(0));
                if let (Some(field), Some(last)) = (&status.timestamp_field, &status.last_update) {
                    write!(s, ", latest {} = {}", field, last)?;
                }
                s
            }
        };
        writeln!(out, "  - `{}`: {}", status.table, detail)?;
    }
    let consumers = &record.analytics_usage.used_by_consumers;
    if consumers.is_empty() {
        writeln!(out, "- Consumers: none")?;
    } else {
        writeln!(
            out,
            "- Consumers: {}",
            consumers.iter().cloned().collect::<Vec<_>>().join(", ")
        )?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destinations::{DestinationTable, EvidenceTier};
    use crate::gate::{evaluate_core_gate, summarize};
    use crate::config::CoreGateConfig;
    use crate::mock::MockFlags;
    use crate::registry::{RegistrySource, RegistrySourceKind};
    use crate::types::{Track, REPORT_SCHEMA_VERSION};
    use crate::usage::AnalyticsUsage;
    use chrono::Utc;
    use sofia_db::DbTableStatus;

    fn record(identity: &str, status: OverallStatus) -> CollectorAuditRecord {
        CollectorAuditRecord {
            identity: identity.into(),
            track: Track::Primary,
            source_path: Some(format!("scripts/{}.ts", identity)),
            registry_status: RegistryStatus::RegisteredPrimary,
            schedule_status: ScheduleStatus::Scheduled,
            schedule: Some("0 6 * * *".into()),
            destinations: vec![DestinationTable::new("sofia.t", EvidenceTier::ExplicitWrite)],
            db_status: vec![DbTableStatus::present("sofia.t", 0)],
            analytics_usage: AnalyticsUsage::default(),
            mock_flags: MockFlags::default(),
            overall_status: status,
        }
    }

    fn report(records: Vec<CollectorAuditRecord>) -> AuditReport {
        let gate = evaluate_core_gate(
            &CoreGateConfig {
                source_patterns: vec!["github".into()],
                tables: vec![],
            },
            &records,
            "",
            true,
        );
        AuditReport {
            generated_at: Utc::now(),
            schema_version: REPORT_SCHEMA_VERSION.into(),
            database_available: true,
            summary: summarize(&records, gate),
            registry_sources: vec![RegistrySource {
                path: "scripts/collect.ts".into(),
                kind: RegistrySourceKind::Dispatch,
                readable: true,
                entries: 3,
            }],
            collectors: records,
        }
    }

    #[test]
    fn test_sections_present() {
        let md = render_markdown(&report(vec![record("ga4", OverallStatus::Dead)])).unwrap();
        for heading in [
            "## Usage",
            "## What PASS means",
            "## Executive Summary",
            "## Core Health Gate",
            "## Top 20 non-PASS collectors",
            "## ORPHAN collectors",
            "## Mock detected",
            "## Registry sources",
        ] {
            assert!(md.contains(heading), "missing {heading}");
        }
        assert!(md.contains("**FAILED**"));
        assert!(md.contains("core source 'github' matches no collector"));
        assert!(md.contains("| `scripts/collect.ts` | dispatch | yes | 3 |"));
        assert!(md.contains("destination tables exist but hold no rows"));
    }

    #[test]
    fn test_non_pass_ordered_by_severity_then_identity() {
        let mut records: Vec<_> = (0..25)
            .map(|i| record(&format!("orphan-{:02}", i), OverallStatus::Orphan))
            .collect();
        records.push(record("zz-dead", OverallStatus::Dead));
        records.push(record("aa-partial", OverallStatus::Partial));
        records.push(record("github", OverallStatus::Pass));
        let md = render_markdown(&report(records)).unwrap();

        let dead = md.find("### `zz-dead`").unwrap();
        let partial = md.find("### `aa-partial`").unwrap();
        let orphan = md.find("### `orphan-00`").unwrap();
        assert!(dead < partial && partial < orphan);
        assert!(!md.contains("### `github`"));
        // 2 + 18 orphans fit in the top 20
        assert!(md.contains("### `orphan-17`"));
        assert!(!md.contains("### `orphan-18`"));
        assert!(md.contains("(27 total)"));
    }

    #[test]
    fn test_pipes_escaped_in_cells() {
        assert_eq!(cell("a|b"), "a\\|b");
    }
}
