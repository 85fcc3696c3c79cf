//! Audit settings.
//!
//! Every tunable list lives here and is handed to the engine explicitly.
//! Paths are relative to the project root.

use sofia_db::{ProbeConfig, DEFAULT_SCHEMA};
use std::path::{Path, PathBuf};

/// Overrides the project root (defaults to the working directory).
pub const ROOT_ENV: &str = "SOFIA_AUDIT_ROOT";

pub const JSON_REPORT_NAME: &str = "collector-audit.json";
pub const MARKDOWN_REPORT_NAME: &str = "COLLECTOR-AUDIT.md";

/// Fixed locations of registries, sources, consumers and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLayout {
    pub source_root: PathBuf,
    pub primary_configs: Vec<PathBuf>,
    pub dispatch_file: PathBuf,
    pub legacy_registry: PathBuf,
    pub analytics_dir: PathBuf,
    pub primary_aggregator: PathBuf,
    /// File-name globs for insights pipeline files under `source_root`.
    pub insights_patterns: Vec<String>,
    /// Extensions treated as source when walking `analytics_dir`.
    pub analytics_extensions: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for AuditLayout {
    fn default() -> Self {
        let configs = [
            "collectors.ts",
            "tech-collectors.ts",
            "finance-collectors.ts",
            "research-collectors.ts",
            "social-collectors.ts",
            "jobs-collectors.ts",
        ];
        Self {
            source_root: PathBuf::from("scripts"),
            primary_configs: configs
                .iter()
                .map(|c| Path::new("scripts").join("configs").join(c))
                .collect(),
            dispatch_file: Path::new("scripts").join("collect.ts"),
            legacy_registry: Path::new("scripts")
                .join("legacy")
                .join("collectors-registry.ts"),
            analytics_dir: PathBuf::from("analytics"),
            primary_aggregator: Path::new("analytics").join("mega-analysis.py"),
            insights_patterns: ["ts", "js", "py", "sql"]
                .iter()
                .map(|ext| format!("*insights*.{}", ext))
                .collect(),
            analytics_extensions: ["py", "ts", "js", "sql"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: Path::new("output").join("audit"),
        }
    }
}

/// Collector naming conventions per track (file-name globs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    pub primary: Vec<String>,
    pub legacy: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            primary: vec!["collect-*.ts".into(), "*-collector.ts".into()],
            legacy: vec!["collect_*.py".into(), "*_collector.py".into()],
        }
    }
}

/// Mandatory sources and tables checked by the core health gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreGateConfig {
    /// Case-insensitive regexes over collector identities.
    pub source_patterns: Vec<String>,
    /// Qualified tables the primary aggregator must reference.
    pub tables: Vec<String>,
}

impl Default for CoreGateConfig {
    fn default() -> Self {
        Self {
            source_patterns: ["github", "hacker-?news", "arxiv", "crunchbase|funding", "reddit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tables: [
                "sofia.github_trending",
                "sofia.hackernews_stories",
                "sofia.arxiv_ai_papers",
                "sofia.funding_rounds",
                "sofia.reddit_tech",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Everything the engine needs besides a database handle.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub root: PathBuf,
    pub layout: AuditLayout,
    pub naming: NamingConfig,
    /// Schemas whose `<schema>.<table>` references count as destinations.
    pub schemas: Vec<String>,
    pub core: CoreGateConfig,
    pub probe: ProbeConfig,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl AuditSettings {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: AuditLayout::default(),
            naming: NamingConfig::default(),
            schemas: vec![DEFAULT_SCHEMA.to_string()],
            core: CoreGateConfig::default(),
            probe: ProbeConfig::default(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = lookup(ROOT_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ".".to_string());
        Self::with_root(root)
    }

    pub fn with_core(mut self, core: CoreGateConfig) -> Self {
        self.core = core;
        self
    }

    /// Resolve a layout path against the project root.
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn source_root(&self) -> PathBuf {
        self.path(&self.layout.source_root)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path(&self.layout.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_root_from_lookup() {
        let env: HashMap<&str, &str> = [(ROOT_ENV, "/srv/sofia")].into_iter().collect();
        let settings = AuditSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.root, PathBuf::from("/srv/sofia"));
        assert_eq!(
            settings.output_dir(),
            PathBuf::from("/srv/sofia/output/audit")
        );
    }

    #[test]
    fn test_blank_root_falls_back_to_cwd() {
        let settings = AuditSettings::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(settings.root, PathBuf::from("."));
    }

    #[test]
    fn test_defaults_point_at_fixed_layout() {
        let layout = AuditLayout::default();
        assert_eq!(layout.dispatch_file, PathBuf::from("scripts/collect.ts"));
        assert_eq!(
            layout.primary_aggregator,
            PathBuf::from("analytics/mega-analysis.py")
        );
        assert!(layout
            .primary_configs
            .iter()
            .all(|p| p.starts_with("scripts/configs")));
        assert!(layout.insights_patterns.contains(&"*insights*.sql".to_string()));
    }
}
