//! Registry resolution.
//!
//! Config files are opaque text. Each recognised declaration shape has its
//! own extractor; a shape that drifts simply stops matching and the audit
//! reports the affected collectors as unregistered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AuditSettings;
use crate::patterns::display_relative;
use crate::source::try_read_source_text;
use crate::types::RegistryStatus;

// Heuristic: `'name': { ... schedule: '...' ... }` with no nested braces
// between the key and the schedule field. Nested objects before `schedule`
// defeat the match.
static SINGLE_QUOTED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'([A-Za-z0-9_.-]+)'\s*:\s*\{[^{}]*?\bschedule\s*:\s*'([^']*)'")
        .expect("valid single-quoted block regex")
});

static DOUBLE_QUOTED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([A-Za-z0-9_.-]+)"\s*:\s*\{[^{}]*?\bschedule\s*:\s*"([^"]*)""#)
        .expect("valid double-quoted block regex")
});

static DISPATCH_COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcollectorName\s*===?\s*['"]([A-Za-z0-9_.-]+)['"]"#)
        .expect("valid dispatch regex")
});

// Heuristic: fields must appear in exactly this order with string values.
static LEGACY_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"\{\s*['"]?name['"]?\s*:\s*['"]([^'"]+)['"]\s*,"#,
        r#"\s*['"]?script['"]?\s*:\s*['"]([^'"]+)['"]\s*,"#,
        r#"\s*['"]?schedule['"]?\s*:\s*['"]([^'"]*)['"]\s*,"#,
        r#"\s*['"]?description['"]?\s*:\s*['"]([^'"]*)['"]\s*,?\s*\}"#,
    ))
    .expect("valid legacy literal regex")
});

/// A `name -> schedule` pair from a primary config block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleBlock {
    pub name: String,
    pub schedule: String,
}

/// One entry of the legacy registry literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEntry {
    pub name: String,
    pub script: String,
    pub schedule: String,
    pub description: String,
}

/// Single-quoted primary config blocks.
pub fn extract_single_quoted_blocks(text: &str) -> Vec<ScheduleBlock> {
    extract_blocks(&SINGLE_QUOTED_BLOCK, text)
}

/// Double-quoted primary config blocks.
pub fn extract_double_quoted_blocks(text: &str) -> Vec<ScheduleBlock> {
    extract_blocks(&DOUBLE_QUOTED_BLOCK, text)
}

fn extract_blocks(re: &Regex, text: &str) -> Vec<ScheduleBlock> {
    re.captures_iter(text)
        .map(|c| ScheduleBlock {
            name: c[1].to_string(),
            schedule: c[2].to_string(),
        })
        .collect()
}

/// Names compared against `collectorName` in the dispatch script.
pub fn extract_dispatch_names(text: &str) -> Vec<String> {
    DISPATCH_COMPARISON
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Four-field legacy literals.
pub fn extract_legacy_entries(text: &str) -> Vec<LegacyEntry> {
    LEGACY_LITERAL
        .captures_iter(text)
        .map(|c| LegacyEntry {
            name: c[1].to_string(),
            script: c[2].to_string(),
            schedule: c[3].to_string(),
            description: c[4].to_string(),
        })
        .collect()
}

/// Kind of configuration file a registry source was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrySourceKind {
    PrimaryConfig,
    Dispatch,
    LegacyRegistry,
}

impl fmt::Display for RegistrySourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrySourceKind::PrimaryConfig => write!(f, "primary_config"),
            RegistrySourceKind::Dispatch => write!(f, "dispatch"),
            RegistrySourceKind::LegacyRegistry => write!(f, "legacy_registry"),
        }
    }
}

/// What one configuration file contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub path: String,
    pub kind: RegistrySourceKind,
    pub readable: bool,
    pub entries: usize,
}

/// A collector declared in some registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredCollector {
    pub name: String,
    pub status: RegistryStatus,
    /// `None` for dispatch-only collectors.
    pub schedule: Option<String>,
    /// Legacy script path, relative to the project root.
    pub script: Option<String>,
    /// Scripts named by later, ignored declarations of the same name.
    pub shadowed_scripts: Vec<String>,
}

/// Merged registry view. First declaration of a name wins.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub collectors: BTreeMap<String, DeclaredCollector>,
    pub sources: Vec<RegistrySource>,
}

impl Registry {
    /// Insert unless already declared. Returns whether it was new.
    ///
    /// A duplicate keeps nothing but its script path, so the file it names
    /// is still attributed to the first declaration.
    pub fn declare(&mut self, collector: DeclaredCollector) -> bool {
        if let Some(existing) = self.collectors.get_mut(&collector.name) {
            debug!(collector = %collector.name, "duplicate declaration ignored");
            existing
                .shadowed_scripts
                .extend(collector.script.into_iter().chain(collector.shadowed_scripts));
            return false;
        }
        self.collectors.insert(collector.name.clone(), collector);
        true
    }

    pub fn get(&self, name: &str) -> Option<&DeclaredCollector> {
        self.collectors.get(name)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

/// Read `path`, recording readability. Returns the text when readable.
fn read_registry_file(
    registry: &mut Registry,
    settings: &AuditSettings,
    relative: &Path,
    kind: RegistrySourceKind,
) -> Option<(String, usize)> {
    let path: PathBuf = settings.path(relative);
    let shown = display_relative(&path, &settings.root);
    match try_read_source_text(&path) {
        Ok(Some(text)) => {
            let index = registry.sources.len();
            registry.sources.push(RegistrySource {
                path: shown,
                kind,
                readable: true,
                entries: 0,
            });
            Some((text, index))
        }
        Ok(None) => {
            debug!(path = %shown, "registry file not present");
            registry.sources.push(RegistrySource {
                path: shown,
                kind,
                readable: false,
                entries: 0,
            });
            None
        }
        Err(e) => {
            warn!(path = %shown, error = %e, "failed to read registry file");
            registry.sources.push(RegistrySource {
                path: shown,
                kind,
                readable: false,
                entries: 0,
            });
            None
        }
    }
}

/// Resolve the primary and legacy registries into one map.
pub fn resolve_registry(settings: &AuditSettings) -> Registry {
    let mut registry = Registry::default();

    for config in &settings.layout.primary_configs {
        let Some((text, index)) =
            read_registry_file(&mut registry, settings, config, RegistrySourceKind::PrimaryConfig)
        else {
            continue;
        };
        let blocks: Vec<ScheduleBlock> = extract_single_quoted_blocks(&text)
            .into_iter()
            .chain(extract_double_quoted_blocks(&text))
            .collect();
        registry.sources[index].entries = blocks.len();
        for block in blocks {
            registry.declare(DeclaredCollector {
                name: block.name,
                status: RegistryStatus::RegisteredPrimary,
                schedule: Some(block.schedule),
                script: None,
                shadowed_scripts: Vec::new(),
            });
        }
    }

    if let Some((text, index)) = read_registry_file(
        &mut registry,
        settings,
        &settings.layout.dispatch_file,
        RegistrySourceKind::Dispatch,
    ) {
        let names = extract_dispatch_names(&text);
        registry.sources[index].entries = names.len();
        for name in names {
            registry.declare(DeclaredCollector {
                name,
                status: RegistryStatus::RegisteredPrimary,
                schedule: None,
                script: None,
                shadowed_scripts: Vec::new(),
            });
        }
    }

    if let Some((text, index)) = read_registry_file(
        &mut registry,
        settings,
        &settings.layout.legacy_registry,
        RegistrySourceKind::LegacyRegistry,
    ) {
        let entries = extract_legacy_entries(&text);
        registry.sources[index].entries = entries.len();
        for entry in entries {
            registry.declare(DeclaredCollector {
                name: entry.name,
                status: RegistryStatus::RegisteredLegacy,
                schedule: Some(entry.schedule),
                script: Some(entry.script),
                shadowed_scripts: Vec::new(),
            });
        }
    }

    info!(
        declared = registry.len(),
        sources = registry.sources.len(),
        "registry resolved"
    );
    registry
}
