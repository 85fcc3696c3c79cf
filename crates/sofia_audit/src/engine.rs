//! Audit orchestration.
//!
//! Registry and filesystem views are reconciled into one identity set, then
//! each collector runs through inference, probing, tracing and mock
//! detection in identity order before classification.

use chrono::Utc;
use sofia_db::TableProbe;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::AuditSettings;
use crate::destinations::{DestinationInferrer, SourceLanguage};
use crate::error::Result;
use crate::gate::{evaluate_core_gate, summarize};
use crate::mock::detect_mock;
use crate::patterns::{display_relative, file_stem};
use crate::registry::{resolve_registry, DeclaredCollector, Registry};
use crate::scanner::{CollectorScanner, ScannedCollector};
use crate::source::read_source_text;
use crate::types::{
    AuditReport, CollectorAuditRecord, RegistryStatus, ScheduleStatus, Track,
    REPORT_SCHEMA_VERSION, UNREGISTERED_PREFIX,
};
use crate::usage::ConsumerIndex;

/// A collector after reconciliation, before any source analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollector {
    pub identity: String,
    pub track: Track,
    pub source_path: Option<PathBuf>,
    pub registry_status: RegistryStatus,
    pub schedule_status: ScheduleStatus,
    pub schedule: Option<String>,
}

/// File stems a declared name may live under, most specific first.
fn candidate_stems(name: &str) -> [String; 5] {
    [
        name.to_string(),
        format!("collect-{}", name),
        format!("{}-collector", name),
        format!("collect_{}", name),
        format!("{}_collector", name),
    ]
}

fn resolve_source(
    declared: &DeclaredCollector,
    scanned: &[ScannedCollector],
    root: &Path,
) -> Option<(usize, Track)> {
    let preferred = match declared.status {
        RegistryStatus::RegisteredLegacy => Track::Legacy,
        _ => Track::Primary,
    };

    if let Some(script) = &declared.script {
        let path = root.join(script);
        if let Some(idx) = scanned.iter().position(|s| s.path == path) {
            return Some((idx, scanned[idx].track));
        }
    }

    let mut stems: Vec<String> = Vec::new();
    if let Some(stem) = declared.script.as_deref().and_then(|s| file_stem(Path::new(s))) {
        stems.push(stem.to_string());
    }
    stems.extend(candidate_stems(&declared.name));

    let other = match preferred {
        Track::Primary => Track::Legacy,
        Track::Legacy => Track::Primary,
    };
    for track in [preferred, other] {
        for stem in &stems {
            if let Some(idx) = scanned
                .iter()
                .position(|s| s.track == track && s.stem() == stem.as_str())
            {
                return Some((idx, track));
            }
        }
    }
    None
}

/// Scanned files attributable to a declared name on either track: every
/// script any declaration of the name points at, plus candidate stems.
fn attributable_files(
    declared: &DeclaredCollector,
    scanned: &[ScannedCollector],
    root: &Path,
) -> Vec<usize> {
    let scripts: Vec<&str> = declared
        .script
        .iter()
        .chain(&declared.shadowed_scripts)
        .map(String::as_str)
        .collect();
    let paths: Vec<PathBuf> = scripts.iter().map(|s| root.join(s)).collect();
    let mut stems: Vec<String> = scripts
        .iter()
        .filter_map(|s| file_stem(Path::new(s)))
        .map(str::to_string)
        .collect();
    stems.extend(candidate_stems(&declared.name));

    scanned
        .iter()
        .enumerate()
        .filter(|(_, s)| paths.contains(&s.path) || stems.iter().any(|stem| s.stem() == stem))
        .map(|(idx, _)| idx)
        .collect()
}

/// Merge declared collectors with discovered files, sorted by identity.
///
/// A declared name claims every file attributable to it, so no file of a
/// registered collector resurfaces as `unregistered::`. The record keeps the
/// source resolved for the first declaration.
pub fn reconcile(
    registry: &Registry,
    scanned: &[ScannedCollector],
    root: &Path,
) -> Vec<ResolvedCollector> {
    let mut claimed = vec![false; scanned.len()];
    let mut resolved = Vec::with_capacity(registry.len() + scanned.len());

    for declared in registry.collectors.values() {
        let default_track = match declared.status {
            RegistryStatus::RegisteredLegacy => Track::Legacy,
            _ => Track::Primary,
        };

        let (track, source_path) = match resolve_source(declared, scanned, root) {
            Some((idx, track)) => {
                claimed[idx] = true;
                (track, Some(scanned[idx].path.clone()))
            }
            None => match &declared.script {
                // Legacy scripts that miss the naming convention still resolve.
                Some(script) if root.join(script).is_file() => {
                    (default_track, Some(root.join(script)))
                }
                _ => {
                    debug!(collector = %declared.name, "no source file resolved");
                    (default_track, None)
                }
            },
        };
        for idx in attributable_files(declared, scanned, root) {
            claimed[idx] = true;
        }

        resolved.push(ResolvedCollector {
            identity: declared.name.clone(),
            track,
            source_path,
            registry_status: declared.status,
            schedule_status: ScheduleStatus::from_schedule(declared.schedule.as_deref()),
            schedule: declared.schedule.clone(),
        });
    }

    let mut seen_unregistered = HashSet::new();
    for (collector, _) in scanned.iter().zip(&claimed).filter(|(_, c)| !**c) {
        let identity = format!("{}{}", UNREGISTERED_PREFIX, collector.stem());
        if !seen_unregistered.insert(identity.clone()) {
            warn!(
                collector = %identity,
                path = %collector.path.display(),
                "duplicate unregistered collector stem, keeping first by path"
            );
            continue;
        }
        resolved.push(ResolvedCollector {
            identity,
            track: collector.track,
            source_path: Some(collector.path.clone()),
            registry_status: RegistryStatus::Unregistered,
            schedule_status: ScheduleStatus::Unscheduled,
            schedule: None,
        });
    }

    resolved.sort_by(|a, b| a.identity.cmp(&b.identity));
    resolved
}

/// Runs one audit against a table probe.
pub struct AuditEngine<'a, P> {
    settings: &'a AuditSettings,
    prober: &'a P,
}

impl<'a, P: TableProbe> AuditEngine<'a, P> {
    pub fn new(settings: &'a AuditSettings, prober: &'a P) -> Self {
        Self { settings, prober }
    }

    pub async fn run(&self) -> Result<AuditReport> {
        let settings = self.settings;
        let scanner = CollectorScanner::new(&settings.naming)?;
        let inferrer = DestinationInferrer::new(&settings.schemas)?;

        let scanned = scanner.scan(&settings.source_root());
        let registry = resolve_registry(settings);
        let collectors = reconcile(&registry, &scanned, &settings.root);
        info!(
            scanned = scanned.len(),
            declared = registry.len(),
            collectors = collectors.len(),
            "collectors reconciled"
        );

        let database_available = match self.prober.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "database unavailable, table probes skipped");
                false
            }
        };

        let consumers = ConsumerIndex::load(settings)?;

        let mut records = Vec::with_capacity(collectors.len());
        for collector in collectors {
            let record = self
                .audit_collector(collector, &inferrer, &consumers, database_available)
                .await;
            records.push(record);
        }

        let gate = evaluate_core_gate(
            &settings.core,
            &records,
            consumers.primary_aggregator_text(),
            database_available,
        );
        if gate.passed {
            info!("core health gate passed");
        } else {
            warn!(failures = gate.failures.len(), "core health gate failed");
        }

        let summary = summarize(&records, gate);
        Ok(AuditReport {
            generated_at: Utc::now(),
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            database_available,
            summary,
            registry_sources: registry.sources,
            collectors: records,
        })
    }

    async fn audit_collector(
        &self,
        collector: ResolvedCollector,
        inferrer: &DestinationInferrer,
        consumers: &ConsumerIndex,
        database_available: bool,
    ) -> CollectorAuditRecord {
        let text = collector
            .source_path
            .as_deref()
            .map(read_source_text)
            .unwrap_or_default();
        let language = SourceLanguage::from_path(collector.source_path.as_deref());

        let destinations = inferrer.infer(&text, language);

        let mut db_status = Vec::new();
        if database_available {
            for destination in &destinations {
                db_status.push(self.prober.probe_table(&destination.table).await);
            }
        }

        let analytics_usage = consumers.trace(destinations.iter().map(|d| d.table.as_str()));
        let mock_flags = detect_mock(&text);
        let overall_status = classify(
            collector.registry_status,
            collector.schedule_status,
            &db_status,
            &analytics_usage,
        );

        debug!(
            collector = %collector.identity,
            destinations = destinations.len(),
            status = %overall_status,
            "collector classified"
        );

        CollectorAuditRecord {
            source_path: collector
                .source_path
                .as_deref()
                .map(|p| display_relative(p, &self.settings.root)),
            identity: collector.identity,
            track: collector.track,
            registry_status: collector.registry_status,
            schedule_status: collector.schedule_status,
            schedule: collector.schedule,
            destinations,
            db_status,
            analytics_usage,
            mock_flags,
            overall_status,
        }
    }
}

/// Convenience wrapper around [`AuditEngine::run`].
pub async fn run_audit<P: TableProbe>(settings: &AuditSettings, prober: &P) -> Result<AuditReport> {
    AuditEngine::new(settings, prober).run().await
}
