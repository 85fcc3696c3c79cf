use crate::error::Result;
use crate::types::AuditReport;

/// Pretty-printed JSON with a trailing newline.
pub fn render_json(report: &AuditReport) -> Result<String> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}
