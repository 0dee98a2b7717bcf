// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for Catalog operations
//!
//! This module defines the error types used throughout the catalog layer.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur during Catalog operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum CatalogError {
    /// Failed to connect to the metadata source
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution timed out
    #[error("Query timed out after {0}s")]
    QueryTimeout(u64),

    /// Requested table was not found
    #[error("Table '{0}' not found in schema '{1}'")]
    TableNotFound(String, String),

    /// Failed to serialize or deserialize schema data
    #[error("Failed to read schema data: {0}")]
    SerializationError(String),

    /// The specified feature is not supported by this catalog implementation
    #[error("Feature not supported: {0}")]
    NotSupported(String),
}

impl CatalogError {
    /// Whether the error means "no such object" rather than a transport failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::TableNotFound(_, _))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::TableNotFound("users".to_string(), "public".to_string());
        assert_eq!(err.to_string(), "Table 'users' not found in schema 'public'");
        assert!(err.is_not_found());

        let err = CatalogError::QueryTimeout(5);
        assert_eq!(err.to_string(), "Query timed out after 5s");
        assert!(!err.is_not_found());
    }
}
