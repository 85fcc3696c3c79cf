//! Report artifacts: JSON, Markdown and the console summary.

pub mod console;
mod json;
mod markdown;

pub use json::render_json;
pub use markdown::render_markdown;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{JSON_REPORT_NAME, MARKDOWN_REPORT_NAME};
use crate::error::{AuditError, Result};
use crate::types::AuditReport;

/// Where the artifacts landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Write both artifacts into `dir`, creating it if needed.
pub fn write_reports(report: &AuditReport, dir: &Path) -> Result<ReportPaths> {
    fs::create_dir_all(dir).map_err(|e| AuditError::io(dir, e))?;

    let paths = ReportPaths {
        json: dir.join(JSON_REPORT_NAME),
        markdown: dir.join(MARKDOWN_REPORT_NAME),
    };

    let json = render_json(report)?;
    fs::write(&paths.json, json).map_err(|e| AuditError::io(&paths.json, e))?;

    let markdown = render_markdown(report)?;
    fs::write(&paths.markdown, markdown).map_err(|e| AuditError::io(&paths.markdown, e))?;

    info!(
        json = %paths.json.display(),
        markdown = %paths.markdown.display(),
        "audit reports written"
    );
    Ok(paths)
}
