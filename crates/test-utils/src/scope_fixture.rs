// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! YAML scope fixtures
//!
//! Each fixture is a SQL text with a `|` cursor marker plus what should be
//! true at that cursor:
//!
//! ```yaml
//! - name: set list offers target columns
//!   dialect: mysql
//!   sql: "UPDATE users SET | WHERE id = 1"
//!   scope: AssignmentTargets
//!   visible: [id, email]
//!   absent: [users]
//! ```

use crate::error::{FixtureError, FixtureResult};
use serde::Deserialize;
use sqlscope_ir::Dialect;

/// Cursor marker inside fixture SQL
pub const CURSOR_MARKER: char = '|';

/// One cursor expectation
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeFixture {
    pub name: String,
    #[serde(default)]
    pub dialect: Dialect,
    pub sql: String,
    /// Expected scope role by name, `None` when no scope covers the cursor
    #[serde(default)]
    pub scope: Option<String>,
    /// Names that must be offered at the cursor
    #[serde(default)]
    pub visible: Vec<String>,
    /// Names that must not be offered at the cursor
    #[serde(default)]
    pub absent: Vec<String>,
}

impl ScopeFixture {
    /// SQL without the marker, and the marker's byte offset
    pub fn cursor(&self) -> FixtureResult<(String, usize)> {
        split_cursor(&self.sql).ok_or_else(|| FixtureError::MissingCursor(self.name.clone()))
    }
}

/// Remove the first cursor marker and return its byte offset
pub fn split_cursor(input: &str) -> Option<(String, usize)> {
    let offset = input.find(CURSOR_MARKER)?;
    let mut sql = String::with_capacity(input.len() - 1);
    sql.push_str(&input[..offset]);
    sql.push_str(&input[offset + CURSOR_MARKER.len_utf8()..]);
    Some((sql, offset))
}

/// Parse a YAML list of fixtures
pub fn load_scope_fixtures(yaml: &str) -> FixtureResult<Vec<ScopeFixture>> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_cursor() {
        assert_eq!(
            split_cursor("SELECT | FROM t"),
            Some(("SELECT  FROM t".to_string(), 7))
        );
        assert_eq!(split_cursor("SELECT 1"), None);
    }

    #[test]
    fn test_load_fixtures() {
        let yaml = r#"
- name: projection
  sql: "SELECT | FROM users"
  scope: Projection
  visible: [id]
- name: no cursor
  dialect: mysql
  sql: "SELECT 1"
"#;
        let fixtures = load_scope_fixtures(yaml).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].dialect, Dialect::PostgreSQL);
        assert_eq!(fixtures[0].cursor().unwrap().1, 7);
        assert!(fixtures[0].absent.is_empty());
        assert_eq!(fixtures[1].dialect, Dialect::MySQL);
        assert!(matches!(
            fixtures[1].cursor(),
            Err(FixtureError::MissingCursor(name)) if name == "no cursor"
        ));

        assert!(matches!(
            load_scope_fixtures("- sql: 1"),
            Err(FixtureError::Yaml(_))
        ));
    }
}
