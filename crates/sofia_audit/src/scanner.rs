//! Filesystem collector discovery.
//!
//! Walks the source tree without pruning and keeps every file whose name
//! follows a collector naming convention. Primary conventions win when a
//! name matches both tracks.

use globset::GlobSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::NamingConfig;
use crate::error::Result;
use crate::patterns::{build_name_set, file_stem, name_matches};
use crate::types::Track;

/// A collector source file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScannedCollector {
    pub path: PathBuf,
    pub track: Track,
}

impl ScannedCollector {
    /// Base name without extension; the unregistered identity suffix.
    pub fn stem(&self) -> &str {
        file_stem(&self.path).unwrap_or_default()
    }
}

pub struct CollectorScanner {
    primary: GlobSet,
    legacy: GlobSet,
}

impl CollectorScanner {
    pub fn new(naming: &NamingConfig) -> Result<Self> {
        Ok(Self {
            primary: build_name_set(&naming.primary)?,
            legacy: build_name_set(&naming.legacy)?,
        })
    }

    /// Track implied by a file name, if it is a collector at all.
    pub fn track_of(&self, path: &Path) -> Option<Track> {
        if name_matches(&self.primary, path) {
            Some(Track::Primary)
        } else if name_matches(&self.legacy, path) {
            Some(Track::Legacy)
        } else {
            None
        }
    }

    /// Every collector file below `root`, sorted by path.
    pub fn scan(&self, root: &Path) -> Vec<ScannedCollector> {
        if !root.is_dir() {
            debug!(root = %root.display(), "scan root missing, no collectors discovered");
            return Vec::new();
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry during scan");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(track) = self.track_of(entry.path()) {
                found.push(ScannedCollector {
                    path: entry.into_path(),
                    track,
                });
            }
        }

        found.sort();
        debug!(root = %root.display(), count = found.len(), "collector scan complete");
        found
    }
}
