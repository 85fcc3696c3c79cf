//! Destination table inference.
//!
//! Purely syntactic: a collector "writes to" every schema-qualified table its
//! source names, weighted by how the name appears. Evidence is collected in
//! tier order and the first tier to see a table owns it.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{AuditError, Result};

/// How a destination was evidenced. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    /// Target of INSERT INTO, COPY, UPSERT INTO, MERGE INTO or UPDATE.
    ExplicitWrite,
    /// Named in code outside literals and comments.
    TableReference,
    /// Named only inside a string literal or comment.
    StringLiteral,
}

impl EvidenceTier {
    pub fn confidence(self) -> f64 {
        match self {
            EvidenceTier::ExplicitWrite => 0.9,
            EvidenceTier::TableReference => 0.6,
            EvidenceTier::StringLiteral => 0.3,
        }
    }
}

impl fmt::Display for EvidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceTier::ExplicitWrite => write!(f, "explicit_write"),
            EvidenceTier::TableReference => write!(f, "table_reference"),
            EvidenceTier::StringLiteral => write!(f, "string_literal"),
        }
    }
}

/// An inferred write target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationTable {
    pub table: String,
    pub confidence: f64,
    pub method: EvidenceTier,
}

impl DestinationTable {
    pub fn new(table: impl Into<String>, method: EvidenceTier) -> Self {
        Self {
            table: table.into(),
            confidence: method.confidence(),
            method,
        }
    }
}

/// Comment and quoting rules used when blanking literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    /// TypeScript / JavaScript: `//`, `/* */`, `'`, `"`, backtick.
    Script,
    /// `#` comments, triple-quoted strings.
    Python,
    /// `--`, `/* */`.
    Sql,
}

impl SourceLanguage {
    pub fn from_path(path: Option<&Path>) -> Self {
        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("py") => SourceLanguage::Python,
            Some("sql") => SourceLanguage::Sql,
            _ => SourceLanguage::Script,
        }
    }
}

pub struct DestinationInferrer {
    explicit_write: Regex,
    qualified: Regex,
}

impl DestinationInferrer {
    /// Build matchers for references into any of `schemas`.
    pub fn new<S: AsRef<str>>(schemas: &[S]) -> Result<Self> {
        let alternation = schemas
            .iter()
            .map(|s| regex::escape(s.as_ref().trim()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Err(AuditError::Config("no destination schemas configured".into()));
        }
        let table = format!(r"\b({})\.([A-Za-z_][A-Za-z0-9_]*)\b", alternation);

        let explicit_write = RegexBuilder::new(&format!(
            r"\b(?:insert\s+into|upsert\s+into|merge\s+into|copy|update)\s+(?:only\s+)?{}",
            table
        ))
        .case_insensitive(true)
        .build()
        .map_err(|e| AuditError::Pattern(e.to_string()))?;

        let qualified = RegexBuilder::new(&table)
            .case_insensitive(true)
            .build()
            .map_err(|e| AuditError::Pattern(e.to_string()))?;

        Ok(Self {
            explicit_write,
            qualified,
        })
    }

    /// Destinations in tier order, each table once.
    pub fn infer(&self, text: &str, language: SourceLanguage) -> Vec<DestinationTable> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut record = |table: String, tier: EvidenceTier| {
            if seen.insert(table.clone()) {
                found.push(DestinationTable::new(table, tier));
            }
        };

        for caps in self.explicit_write.captures_iter(text) {
            record(normalize(&caps[1], &caps[2]), EvidenceTier::ExplicitWrite);
        }

        // Bare code references only survive in the masked copy; whatever the
        // unmasked pass adds on top must have been inside a literal.
        let masked = mask_literals(text, language);
        for (table, _) in self.references(&masked) {
            record(table, EvidenceTier::TableReference);
        }
        for (table, _) in self.references(text) {
            record(table, EvidenceTier::StringLiteral);
        }

        found
    }

    fn references<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (String, usize)> + 't {
        self.qualified.captures_iter(text).filter_map(move |caps| {
            let whole = caps.get(0)?;
            // `sofia.connect(...)` is a call, not a table.
            if text[whole.end()..].trim_start().starts_with('(') {
                return None;
            }
            Some((normalize(&caps[1], &caps[2]), whole.start()))
        })
    }
}

fn normalize(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table).to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
    TripleQuoted(char),
}

/// Blank string literals and comments, keeping byte offsets stable.
pub fn mask_literals(text: &str, language: SourceLanguage) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut state = LexState::Code;

    let blank = |out: &mut String, ch: char| {
        if ch == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
        }
    };

    while let Some(ch) = chars.next() {
        match state {
            LexState::LineComment => {
                if ch == '\n' {
                    state = LexState::Code;
                }
                blank(&mut out, ch);
            }
            LexState::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = LexState::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
            LexState::Quoted(quote) => {
                blank(&mut out, ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if ch == quote || (ch == '\n' && quote != '`') {
                    state = LexState::Code;
                }
            }
            LexState::TripleQuoted(quote) => {
                blank(&mut out, ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if ch == quote && take_pair(&mut chars, quote) {
                    out.push_str("  ");
                    state = LexState::Code;
                }
            }
            LexState::Code => {
                let next = chars.peek().copied();
                match (language, ch, next) {
                    (SourceLanguage::Script | SourceLanguage::Sql, '/', Some('*')) => {
                        chars.next();
                        out.push_str("  ");
                        state = LexState::BlockComment;
                    }
                    (SourceLanguage::Script, '/', Some('/')) => {
                        chars.next();
                        out.push_str("  ");
                        state = LexState::LineComment;
                    }
                    (SourceLanguage::Sql, '-', Some('-')) => {
                        chars.next();
                        out.push_str("  ");
                        state = LexState::LineComment;
                    }
                    (SourceLanguage::Python, '#', _) => {
                        out.push(' ');
                        state = LexState::LineComment;
                    }
                    (SourceLanguage::Python, '\'' | '"', _) => {
                        out.push(' ');
                        if take_pair(&mut chars, ch) {
                            out.push_str("  ");
                            state = LexState::TripleQuoted(ch);
                        } else {
                            state = LexState::Quoted(ch);
                        }
                    }
                    (SourceLanguage::Script, '\'' | '"' | '`', _)
                    | (SourceLanguage::Sql, '\'' | '"', _) => {
                        out.push(' ');
                        state = LexState::Quoted(ch);
                    }
                    _ => out.push(ch),
                }
            }
        }
    }

    out
}

/// Consume two more `quote` chars if both follow; otherwise consume nothing.
fn take_pair(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> bool {
    let mut lookahead = chars.clone();
    if lookahead.next() == Some(quote) && lookahead.next() == Some(quote) {
        chars.next();
        chars.next();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inferrer() -> DestinationInferrer {
        DestinationInferrer::new(&["sofia"]).unwrap()
    }

    #[test]
    fn test_explicit_write_in_query_string() {
        let src = r#"await pool.query(`INSERT INTO sofia.analytics_events (id) VALUES ($1)`, [id]);"#;
        let found = inferrer().infer(src, SourceLanguage::Script);
        assert_eq!(
            found,
            vec![DestinationTable::new(
                "sofia.analytics_events",
                EvidenceTier::ExplicitWrite
            )]
        );
        assert_eq!(found[0].confidence, 0.9);
    }

    #[test]
    fn test_all_write_verbs_case_insensitive() {
        let src = "insert into sofia.a\nCOPY sofia.b FROM STDIN\nUpsert Into sofia.c\nmerge into sofia.d\nUPDATE ONLY sofia.e SET x = 1";
        let found = inferrer().infer(src, SourceLanguage::Sql);
        let tables: Vec<_> = found.iter().map(|d| d.table.as_str()).collect();
        assert_eq!(tables, vec!["sofia.a", "sofia.b", "sofia.c", "sofia.d", "sofia.e"]);
        assert!(found.iter().all(|d| d.method == EvidenceTier::ExplicitWrite));
    }

    #[test]
    fn test_explicit_write_outranks_later_reference() {
        let src = "const T = sofia.events;\nconst sql = 'INSERT INTO sofia.events VALUES (1)';";
        let found = inferrer().infer(src, SourceLanguage::Script);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, EvidenceTier::ExplicitWrite);
        assert_eq!(found[0].confidence, 0.9);
    }

    #[test]
    fn test_code_reference_then_literal() {
        let src = "const target = schema.sofia.jobs_raw;\n// legacy: sofia.jobs_old\nlog('see sofia.jobs_archive');";
        let found = inferrer().infer(src, SourceLanguage::Script);
        assert_eq!(
            found,
            vec![
                DestinationTable::new("sofia.jobs_raw", EvidenceTier::TableReference),
                DestinationTable::new("sofia.jobs_old", EvidenceTier::StringLiteral),
                DestinationTable::new("sofia.jobs_archive", EvidenceTier::StringLiteral),
            ]
        );
    }

    #[test]
    fn test_unconfigured_schemas_and_calls_ignored() {
        let src = "console.log(process.env.X); sofia.connect(); public.users;";
        assert!(inferrer().infer(src, SourceLanguage::Script).is_empty());
    }

    #[test]
    fn test_python_comments_and_triple_quotes() {
        let src = "# writes sofia.papers\nTABLE = sofia.papers_v2\nDOC = \"\"\"\nsee sofia.papers_doc\n\"\"\"\n";
        let found = inferrer().infer(src, SourceLanguage::Python);
        assert_eq!(found[0], DestinationTable::new("sofia.papers_v2", EvidenceTier::TableReference));
        assert!(found
            .iter()
            .any(|d| d.table == "sofia.papers" && d.method == EvidenceTier::StringLiteral));
        assert!(found
            .iter()
            .any(|d| d.table == "sofia.papers_doc" && d.method == EvidenceTier::StringLiteral));
    }

    #[test]
    fn test_mask_keeps_offsets() {
        let src = "a = 'é sofia.x' // ü\nb";
        let masked = mask_literals(src, SourceLanguage::Script);
        assert_eq!(masked.len(), src.len());
        assert!(masked.starts_with("a = "));
        assert!(masked.ends_with("\nb"));
        assert!(!masked.contains("sofia"));
    }

    #[test]
    fn test_schema_match_is_normalized() {
        let found = inferrer().infer("INSERT INTO SOFIA.Events", SourceLanguage::Sql);
        assert_eq!(found[0].table, "sofia.events");
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(SourceLanguage::from_path(Some(Path::new("a/collect_x.PY"))), SourceLanguage::Python);
        assert_eq!(SourceLanguage::from_path(Some(Path::new("q.sql"))), SourceLanguage::Sql);
        assert_eq!(SourceLanguage::from_path(None), SourceLanguage::Script);
    }

    #[test]
    fn test_empty_schema_list_rejected() {
        assert!(DestinationInferrer::new::<&str>(&[]).is_err());
    }
}
