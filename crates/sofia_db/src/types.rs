//! Shared types for table probes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sql_guard::quote_ident;

/// Schema used when a table name carries no schema prefix.
pub const DEFAULT_SCHEMA: &str = "sofia";

/// A `schema.table` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedTable {
    pub schema: String,
    pub table: String,
}

impl QualifiedTable {
    /// Split `schema.table`, falling back to `default_schema` when the name
    /// is bare.
    pub fn parse(name: &str, default_schema: &str) -> Self {
        let name = name.trim();
        match name.split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => Self {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            _ => Self {
                schema: default_schema.to_string(),
                table: name.trim_start_matches('.').to_string(),
            },
        }
    }

    /// `"schema"."table"`, safe to splice into a statement.
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Live state of one destination table.
///
/// `exists == false` short-circuits every other field except `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTableStatus {
    pub table: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DbTableStatus {
    /// Table is absent from the catalog.
    pub fn missing(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            exists: false,
            row_count: None,
            last_update: None,
            timestamp_field: None,
            error: None,
        }
    }

    /// Table exists with a known row count.
    pub fn present(table: impl Into<String>, row_count: i64) -> Self {
        Self {
            row_count: Some(row_count),
            exists: true,
            ..Self::missing(table)
        }
    }

    /// Probe failed; recorded as absent with the failure message.
    pub fn failed(table: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::missing(table)
        }
    }

    /// Record the freshest value of a timestamp column.
    pub fn with_last_update(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.timestamp_field = Some(field.into());
        self.last_update = Some(value.into());
        self
    }

    /// Exists and holds at least one row.
    pub fn has_data(&self) -> bool {
        self.exists && self.row_count.unwrap_or(0) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_and_bare() {
        let q = QualifiedTable::parse("sofia.analytics_events", DEFAULT_SCHEMA);
        assert_eq!(q.schema, "sofia");
        assert_eq!(q.table, "analytics_events");

        let bare = QualifiedTable::parse("jobs", "public");
        assert_eq!(bare.to_string(), "public.jobs");
        assert_eq!(bare.quoted(), "\"public\".\"jobs\"");
    }

    #[test]
    fn test_has_data() {
        assert!(DbTableStatus::present("sofia.a", 3).has_data());
        assert!(!DbTableStatus::present("sofia.a", 0).has_data());
        assert!(!DbTableStatus::missing("sofia.a").has_data());
        assert!(!DbTableStatus::failed("sofia.a", "permission denied").has_data());
    }

    #[test]
    fn test_missing_serializes_without_optional_fields() {
        let json = serde_json::to_value(DbTableStatus::missing("sofia.gone")).unwrap();
        assert_eq!(json, serde_json::json!({ "table": "sofia.gone", "exists": false }));
    }
}
