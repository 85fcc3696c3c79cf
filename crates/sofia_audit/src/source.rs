//! Failure-tolerant source reads.
//!
//! Collector sources, registry configs and consumer files are all treated as
//! opaque text. A file that cannot be read contributes nothing to the audit.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Read `path` as UTF-8, yielding empty text on any failure.
pub fn read_source_text(path: &Path) -> String {
    match try_read_source_text(path) {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!(path = %path.display(), "source file not found");
            String::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read source file");
            String::new()
        }
    }
}

/// Fallible form: `Ok(None)` when the file is absent.
pub fn try_read_source_text(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.ts");
        assert_eq!(read_source_text(&path), "");
        assert!(try_read_source_text(&path).unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.py");
        fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        assert_eq!(read_source_text(&path), "");
        assert!(try_read_source_text(&path).is_err());
    }

    #[test]
    fn test_reads_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collect-x.ts");
        fs::write(&path, "INSERT INTO sofia.x").unwrap();
        assert_eq!(read_source_text(&path), "INSERT INTO sofia.x");
    }
}
