// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Catalog trait for schema metadata
//!
//! The catalog is the only suspension point of an analysis: the analyzer
//! awaits it between the structural pass and the data pass, and stores the
//! answers in a [`MetadataCache`](crate::MetadataCache) that the data pass
//! reads synchronously.

use crate::error::CatalogResult;
use sqlscope_ir::{ColumnMetadata, FunctionMetadata, TableMetadata};

/// Async provider of table, column and function metadata
///
/// Implementations can connect to live databases, read from static files, or
/// answer from memory.
///
/// # Examples
///
/// ```rust,ignore
/// use sqlscope_catalog::{Catalog, CatalogError};
///
/// async fn table_names(catalog: &impl Catalog) -> Result<Vec<String>, CatalogError> {
///     let tables = catalog.list_tables().await?;
///     Ok(tables.into_iter().map(|t| t.qualified_name()).collect())
/// }
/// ```
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// List all tables and views visible to the provider
    async fn list_tables(&self) -> CatalogResult<Vec<TableMetadata>>;

    /// Get column metadata for a table
    ///
    /// `table` may carry a schema qualifier (`schema.table`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TableNotFound` if the table doesn't exist; any
    /// other error is treated as a transport failure by the analyzer.
    async fn get_columns(&self, table: &str) -> CatalogResult<Vec<ColumnMetadata>>;

    /// List all available functions
    async fn list_functions(&self) -> CatalogResult<Vec<FunctionMetadata>>;
}
