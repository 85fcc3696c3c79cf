//! Mock and placeholder markers in collector source.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const MAX_EVIDENCE_LINES: usize = 5;
pub const MAX_EVIDENCE_CHARS: usize = 100;

static MOCK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:mock|placeholder)\b",
        r"TODO\s*:?\s*mock",
        r"FIXME\s*:?\s*(?:mock|placeholder|hardcoded)",
        r"hard[- ]?coded\s+data",
        r"fake\s+data",
        r"dummy\s+data",
    ]
    .iter()
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .expect("valid mock pattern")
    })
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockFlags {
    pub mock_detected: bool,
    pub evidence_lines: Vec<String>,
}

/// Scan `text` line by line; first matching pattern per line wins.
pub fn detect_mock(text: &str) -> MockFlags {
    let evidence_lines: Vec<String> = text
        .lines()
        .filter(|line| MOCK_PATTERNS.iter().any(|re| re.is_match(line)))
        .take(MAX_EVIDENCE_LINES)
        .map(|line| line.trim().chars().take(MAX_EVIDENCE_CHARS).collect())
        .collect();

    MockFlags {
        mock_detected: !evidence_lines.is_empty(),
        evidence_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_source() {
        let flags = detect_mock("const rows = await fetchAll();\nawait upsert(rows);");
        assert!(!flags.mock_detected);
        assert!(flags.evidence_lines.is_empty());
    }

    #[test]
    fn test_each_marker_kind() {
        let src = "\
const data = MOCK_ROWS; // mock
// TODO: mock until API key arrives
# FIXME: hardcoded values
rows = hardcoded data
return fake data
use dummy data here
title = 'placeholder'";
        let flags = detect_mock(src);
        assert!(flags.mock_detected);
        assert_eq!(flags.evidence_lines.len(), MAX_EVIDENCE_LINES);
        assert_eq!(flags.evidence_lines[1], "// TODO: mock until API key arrives");
    }

    #[test]
    fn test_one_entry_per_line() {
        let flags = detect_mock("  // mock placeholder fake data  ");
        assert_eq!(flags.evidence_lines, vec!["// mock placeholder fake data"]);
    }

    #[test]
    fn test_lines_truncated() {
        let long = format!("// placeholder {}", "x".repeat(300));
        let flags = detect_mock(&long);
        assert_eq!(flags.evidence_lines[0].chars().count(), MAX_EVIDENCE_CHARS);
    }

    #[test]
    fn test_word_boundaries() {
        // `mockingbird` and `placeholders` are not markers
        assert!(!detect_mock("const mockingbird = 1; const placeholders = [];").mock_detected);
    }
}
