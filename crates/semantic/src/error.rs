// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for semantic analysis
//!
//! Name lookups in rows contexts return these errors. They never escape the
//! recognizer: each one is turned into a diagnostic and analysis continues.

use thiserror::Error;

/// Result type alias for semantic operations
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that can occur during name resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// Table not found in the catalog
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Column not found in any visible source
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Column reference is ambiguous (found in multiple sources)
    #[error("Ambiguous column reference: {0} (found in {1:?})")]
    AmbiguousColumn(String, Vec<String>),

    /// Qualifier does not name any visible source
    #[error("Unknown table or alias: {0}")]
    UnknownQualifier(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_table_not_found() {
        let err = SemanticError::TableNotFound("users".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("users"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_error_display_ambiguous_column() {
        let err = SemanticError::AmbiguousColumn(
            "id".to_string(),
            vec!["users".to_string(), "orders".to_string()],
        );
        let msg = format!("{}", err);
        assert!(msg.contains("Ambiguous"));
        assert!(msg.contains("users"));
        assert!(msg.contains("orders"));
    }

    #[test]
    fn test_error_display_unknown_qualifier() {
        let err = SemanticError::UnknownQualifier("u".to_string());
        assert_eq!(err.to_string(), "Unknown table or alias: u");
    }
}
