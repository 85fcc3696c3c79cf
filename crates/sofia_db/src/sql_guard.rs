//! Read-only statement guard.
//!
//! Every statement the prober builds goes through [`validate_read_only`]
//! before it reaches the pool. The check is lexical: literals, quoted
//! identifiers and comments are skipped, and the remaining bare words must
//! form a single SELECT/WITH statement with no write keyword anywhere.

use thiserror::Error;

const READ_PREFIXES: &[&str] = &["SELECT", "WITH"];
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "COPY", "GRANT",
    "REVOKE", "VACUUM", "LOCK",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlGuardError {
    #[error("statement is empty")]
    Empty,
    #[error("statement must start with SELECT or WITH, found {0}")]
    NotARead(String),
    #[error("more than one statement")]
    MultipleStatements,
    #[error("statement contains write keyword {0}")]
    WriteKeyword(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Lexeme {
    /// Bare word, upper-cased.
    Word(String),
    Semicolon,
}

/// Bare words and semicolons outside literals, quoted identifiers and comments.
fn lex(sql: &str) -> Vec<Lexeme> {
    let mut out = Vec::new();
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    let flush = |word: &mut String, out: &mut Vec<Lexeme>| {
        if !word.is_empty() {
            out.push(Lexeme::Word(word.to_ascii_uppercase()));
            word.clear();
        }
    };

    while let Some(ch) = chars.next() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        flush(&mut word, &mut out);

        match ch {
            ';' => out.push(Lexeme::Semicolon),
            '\'' | '"' => {
                // Doubled quote is an escaped quote inside the literal.
                while let Some(c) = chars.next() {
                    if c == ch {
                        if chars.peek() == Some(&ch) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => {}
        }
    }
    flush(&mut word, &mut out);
    out
}

/// Reject anything but a single read-only statement.
pub fn validate_read_only(sql: &str) -> Result<(), SqlGuardError> {
    let lexemes = lex(sql);

    let first = lexemes
        .iter()
        .find_map(|l| match l {
            Lexeme::Word(w) => Some(w.as_str()),
            Lexeme::Semicolon => None,
        })
        .ok_or(SqlGuardError::Empty)?;
    if !READ_PREFIXES.contains(&first) {
        return Err(SqlGuardError::NotARead(first.to_string()));
    }

    if let Some(pos) = lexemes.iter().position(|l| *l == Lexeme::Semicolon) {
        if lexemes[pos..].iter().any(|l| matches!(l, Lexeme::Word(_))) {
            return Err(SqlGuardError::MultipleStatements);
        }
    }

    for lexeme in &lexemes {
        if let Lexeme::Word(w) = lexeme {
            if WRITE_KEYWORDS.contains(&w.as_str()) {
                return Err(SqlGuardError::WriteKeyword(w.clone()));
            }
        }
    }

    Ok(())
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_statements_pass() {
        assert_eq!(validate_read_only("SELECT COUNT(*) FROM \"sofia\".\"events\""), Ok(()));
        assert_eq!(
            validate_read_only("SELECT MAX(\"collected_at\")::text FROM \"sofia\".\"events\""),
            Ok(())
        );
        assert_eq!(validate_read_only("with t as (select 1) select * from t"), Ok(()));
    }

    #[test]
    fn test_writes_rejected() {
        assert_eq!(
            validate_read_only("INSERT INTO sofia.events VALUES (1)"),
            Err(SqlGuardError::NotARead("INSERT".into()))
        );
        assert_eq!(
            validate_read_only("WITH d AS (DELETE FROM sofia.events RETURNING *) SELECT 1"),
            Err(SqlGuardError::WriteKeyword("DELETE".into()))
        );
        assert!(validate_read_only("truncate sofia.events").is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_read_only("  -- nothing\n"), Err(SqlGuardError::Empty));
        assert_eq!(validate_read_only(";"), Err(SqlGuardError::Empty));
    }

    #[test]
    fn test_keywords_in_literals_and_comments_ignored() {
        assert!(validate_read_only("SELECT 1 -- INSERT INTO events").is_ok());
        assert!(validate_read_only("SELECT 1 /* DROP */ FROM events").is_ok());
        assert!(validate_read_only("SELECT 'DROP TABLE x' FROM events").is_ok());
        assert!(validate_read_only("SELECT 'it''s; DROP' FROM events").is_ok());
    }

    #[test]
    fn test_quoted_table_named_like_keyword() {
        assert!(validate_read_only("SELECT COUNT(*) FROM \"sofia\".\"update\"").is_ok());
        assert!(validate_read_only("SELECT COUNT(*) FROM \"sofia\".\"copy\"").is_ok());
    }

    #[test]
    fn test_one_statement_only() {
        assert_eq!(
            validate_read_only("SELECT 1; DROP TABLE events"),
            Err(SqlGuardError::MultipleStatements)
        );
        assert!(validate_read_only("SELECT 1; ").is_ok());
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("events"), "\"events\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident("x\"; DROP TABLE y; --"));
        assert!(validate_read_only(&sql).is_ok());
    }
}
