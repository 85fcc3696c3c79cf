//! Downstream consumer tracing.
//!
//! A table is "used" by a consumer when the consumer's text contains the
//! qualified table name anywhere, ignoring case. Substring matching
//! over-reports on purpose: a false PASS is cheaper to investigate than a
//! missed consumer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::AuditSettings;
use crate::error::Result;
use crate::patterns::{build_name_set, file_name, name_matches};
use crate::source::read_source_text;

/// Which downstream stage a consumer file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    PrimaryAggregator,
    InsightsPipeline,
    Analytics,
}

#[derive(Debug, Clone)]
pub struct Consumer {
    pub name: String,
    pub kind: ConsumerKind,
    pub text: String,
}

/// Downstream references for one collector's tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsUsage {
    pub used_by_primary_aggregator: bool,
    pub used_by_insights_pipeline: bool,
    pub used_by_consumers: BTreeSet<String>,
}

impl AnalyticsUsage {
    pub fn is_consumed(&self) -> bool {
        self.used_by_primary_aggregator
            || self.used_by_insights_pipeline
            || !self.used_by_consumers.is_empty()
    }
}

/// Consumer texts, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct ConsumerIndex {
    consumers: Vec<Consumer>,
    /// Lowercased consumer texts, index-aligned with `consumers`.
    folded: Vec<String>,
}

impl ConsumerIndex {
    pub fn new(consumers: Vec<Consumer>) -> Self {
        let folded = consumers.iter().map(|c| c.text.to_lowercase()).collect();
        Self { consumers, folded }
    }

    /// Load the primary aggregator, insights files and analytics sources.
    pub fn load(settings: &AuditSettings) -> Result<Self> {
        let mut consumers = Vec::new();

        let aggregator = settings.path(&settings.layout.primary_aggregator);
        if !aggregator.is_file() {
            warn!(path = %aggregator.display(), "primary aggregator not found");
        }
        consumers.push(Consumer {
            name: file_name(&aggregator).unwrap_or_default().to_string(),
            kind: ConsumerKind::PrimaryAggregator,
            text: read_source_text(&aggregator),
        });

        let insights = build_name_set(&settings.layout.insights_patterns)?;
        for path in walk_files(&settings.source_root()) {
            if name_matches(&insights, &path) {
                consumers.push(consumer_from(&path, ConsumerKind::InsightsPipeline));
            }
        }

        for path in walk_files(&settings.path(&settings.layout.analytics_dir)) {
            let is_source = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| {
                    settings
                        .layout
                        .analytics_extensions
                        .iter()
                        .any(|x| x.eq_ignore_ascii_case(e))
                })
                .unwrap_or(false);
            if is_source {
                consumers.push(consumer_from(&path, ConsumerKind::Analytics));
            }
        }

        debug!(consumers = consumers.len(), "consumer index loaded");
        Ok(Self::new(consumers))
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Text of the primary aggregator, empty when it was unreadable.
    pub fn primary_aggregator_text(&self) -> &str {
        self.consumers
            .iter()
            .find(|c| c.kind == ConsumerKind::PrimaryAggregator)
            .map(|c| c.text.as_str())
            .unwrap_or("")
    }

    /// Trace every table; consumers are deduplicated by file name.
    pub fn trace<'a, I>(&self, tables: I) -> AnalyticsUsage
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut usage = AnalyticsUsage::default();
        for table in tables {
            let needle = table.to_lowercase();
            for (consumer, text) in self.consumers.iter().zip(&self.folded) {
                if text.is_empty() || !text.contains(needle.as_str()) {
                    continue;
                }
                match consumer.kind {
                    ConsumerKind::PrimaryAggregator => usage.used_by_primary_aggregator = true,
                    ConsumerKind::InsightsPipeline => usage.used_by_insights_pipeline = true,
                    ConsumerKind::Analytics => {}
                }
                usage.used_by_consumers.insert(consumer.name.clone());
            }
        }
        usage
    }
}

fn consumer_from(path: &Path, kind: ConsumerKind) -> Consumer {
    Consumer {
        name: file_name(path).unwrap_or_default().to_string(),
        kind,
        text: read_source_text(path),
    }
}

fn walk_files(root: &Path) -> Vec<std::path::PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable consumer entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
