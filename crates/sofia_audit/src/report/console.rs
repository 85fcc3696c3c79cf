//! Console summary printed after the artifacts are written.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use crate::classify::OverallStatus;
use crate::report::ReportPaths;
use crate::types::AuditReport;

fn status_color(status: OverallStatus) -> Color {
    match status {
        OverallStatus::Pass => Color::Green,
        OverallStatus::Partial => Color::Yellow,
        OverallStatus::Dead => Color::Red,
        OverallStatus::Orphan => Color::Grey,
        OverallStatus::Mismatch => Color::Magenta,
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

/// Status distribution plus gate outcome.
pub fn summary_table(report: &AuditReport) -> Table {
    let summary = &report.summary;
    let mut table = new_table(&["Status", "Collectors"]);
    for status in OverallStatus::ALL {
        table.add_row(vec![
            Cell::new(status.as_str()).fg(status_color(status)),
            Cell::new(summary.by_status.get(status)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(summary.total_collectors),
    ]);
    table
}

pub fn print_summary(report: &AuditReport, paths: &ReportPaths) {
    println!("{}", summary_table(report));

    let gate = &report.summary.core_health;
    if gate.passed {
        println!("Core health gate: PASSED");
    } else {
        println!("Core health gate: FAILED");
        let mut failures = new_table(&["#", "Reason"]);
        for (i, reason) in gate.failures.iter().enumerate() {
            failures.add_row(vec![
                Cell::new(i + 1),
                Cell::new(reason).fg(Color::Red),
            ]);
        }
        println!("{}", failures);
    }

    if !report.database_available {
        println!("Database unavailable: destination tables were not probed.");
    }
    println!("JSON:     {}", paths.json.display());
    println!("Markdown: {}", paths.markdown.display());
}
