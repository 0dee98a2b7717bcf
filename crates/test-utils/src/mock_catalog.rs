// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock catalog implementation for testing
//!
//! Provides an in-memory catalog with builder pattern for easy test setup.
//! Besides plain answers it can simulate transport failures and count calls,
//! so tests can check how the analyzer behaves when metadata is unavailable.

use async_trait::async_trait;
use sqlscope_catalog::{Catalog, CatalogError, CatalogResult};
use sqlscope_ir::{
    ColumnMetadata, DataType, FunctionMetadata, FunctionType, TableMetadata, TableType,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory mock catalog for testing
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    tables: Vec<TableMetadata>,
    functions: Vec<FunctionMetadata>,
    /// Lower-cased table names whose lookup fails with a connection error
    unavailable: HashSet<String>,
    functions_unavailable: bool,
    column_requests: Arc<AtomicUsize>,
}

impl MockCatalog {
    /// Create a new empty mock catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the catalog
    pub fn add_table(mut self, table: TableMetadata) -> Self {
        self.tables.push(table);
        self
    }

    /// Add a function to the catalog
    pub fn add_function(mut self, function: FunctionMetadata) -> Self {
        self.functions.push(function);
        self
    }

    /// Find a table by `name` or `schema.name`, ignoring case
    pub fn get_table(&self, request: &str) -> Option<&TableMetadata> {
        let (schema, name) = match request.rsplit_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, request),
        };
        self.tables.iter().find(|t| {
            t.name.eq_ignore_ascii_case(name)
                && schema.is_none_or(|s| t.schema.eq_ignore_ascii_case(s))
        })
    }

    /// Number of `get_columns` calls served so far, shared between clones
    pub fn column_requests(&self) -> usize {
        self.column_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn list_tables(&self) -> CatalogResult<Vec<TableMetadata>> {
        Ok(self.tables.clone())
    }

    async fn get_columns(&self, table: &str) -> CatalogResult<Vec<ColumnMetadata>> {
        self.column_requests.fetch_add(1, Ordering::SeqCst);
        let bare = table.rsplit('.').next().unwrap_or(table);
        if self.unavailable.contains(&bare.to_ascii_lowercase()) {
            return Err(CatalogError::ConnectionFailed(format!(
                "lost connection while reading {table}"
            )));
        }
        match self.get_table(table) {
            Some(metadata) => Ok(metadata.columns.clone()),
            None => Err(CatalogError::TableNotFound(
                table.to_string(),
                "mock".to_string(),
            )),
        }
    }

    async fn list_functions(&self) -> CatalogResult<Vec<FunctionMetadata>> {
        if self.functions_unavailable {
            return Err(CatalogError::QueryTimeout(5));
        }
        Ok(self.functions.clone())
    }
}

/// Builder for creating mock catalogs with a fluent API
#[derive(Debug, Default)]
pub struct MockCatalogBuilder {
    catalog: MockCatalog,
}

impl MockCatalogBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the standard test schema (users, orders and products tables)
    pub fn with_standard_schema(mut self) -> Self {
        self.catalog = self
            .catalog
            .add_table(TableMetadata::new("users", "myapp").with_columns(vec![
                ColumnMetadata::new("id", DataType::BigInt)
                    .with_nullable(false)
                    .with_primary_key(),
                ColumnMetadata::new("email", DataType::Varchar(Some(255))).with_nullable(false),
                ColumnMetadata::new("name", DataType::Varchar(Some(100))).with_nullable(true),
                ColumnMetadata::new("created_at", DataType::Timestamp).with_nullable(true),
            ]))
            .add_table(
                TableMetadata::new("orders", "myapp")
                    .with_columns(vec![
                        ColumnMetadata::new("id", DataType::BigInt)
                            .with_nullable(false)
                            .with_primary_key(),
                        ColumnMetadata::new("user_id", DataType::BigInt).with_nullable(false),
                        ColumnMetadata::new("total", DataType::Decimal).with_nullable(true),
                        ColumnMetadata::new("status", DataType::Varchar(Some(50)))
                            .with_nullable(false),
                        ColumnMetadata::new("created_at", DataType::Timestamp)
                            .with_nullable(true),
                    ])
                    .with_type(TableType::Table),
            )
            .add_table(TableMetadata::new("products", "myapp").with_columns(vec![
                ColumnMetadata::new("id", DataType::BigInt)
                    .with_nullable(false)
                    .with_primary_key(),
                ColumnMetadata::new("name", DataType::Varchar(Some(255))).with_nullable(false),
                ColumnMetadata::new("price", DataType::Decimal).with_nullable(false),
                ColumnMetadata::new("stock", DataType::Integer).with_nullable(true),
            ]))
            .add_function(
                FunctionMetadata::new("count", DataType::BigInt).with_type(FunctionType::Aggregate),
            )
            .add_function(
                FunctionMetadata::new("sum", DataType::Decimal).with_type(FunctionType::Aggregate),
            )
            .add_function(
                FunctionMetadata::new("max", DataType::Decimal).with_type(FunctionType::Aggregate),
            )
            .add_function(
                FunctionMetadata::new("upper", DataType::Varchar(None))
                    .with_type(FunctionType::Scalar),
            )
            .add_function(
                FunctionMetadata::new("row_number", DataType::BigInt)
                    .with_type(FunctionType::Window),
            );

        self
    }

    /// Add a custom table
    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.catalog = self.catalog.add_table(table);
        self
    }

    /// Add a custom function
    pub fn with_function(mut self, function: FunctionMetadata) -> Self {
        self.catalog = self.catalog.add_function(function);
        self
    }

    /// Make column lookups for `table` fail with a connection error
    pub fn with_unavailable_table(mut self, table: &str) -> Self {
        self.catalog.unavailable.insert(table.to_ascii_lowercase());
        self
    }

    /// Make the function listing time out
    pub fn with_unavailable_functions(mut self) -> Self {
        self.catalog.functions_unavailable = true;
        self
    }

    /// Build the mock catalog
    pub fn build(self) -> MockCatalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_catalog_list_tables() {
        let catalog = MockCatalogBuilder::new().with_standard_schema().build();

        let tables = catalog.list_tables().await.unwrap();
        assert_eq!(tables.len(), 3);

        let table_names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert!(table_names.contains(&"users"));
        assert!(table_names.contains(&"orders"));
        assert!(table_names.contains(&"products"));
    }

    #[tokio::test]
    async fn test_mock_catalog_get_columns() {
        let catalog = MockCatalogBuilder::new().with_standard_schema().build();

        let columns = catalog.get_columns("USERS").await.unwrap();
        let column_names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(column_names, vec!["id", "email", "name", "created_at"]);

        assert!(catalog.get_columns("myapp.orders").await.is_ok());
        let err = catalog.get_columns("other.orders").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(catalog.column_requests(), 3);
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let catalog = MockCatalogBuilder::new()
            .with_standard_schema()
            .with_unavailable_table("Orders")
            .with_unavailable_functions()
            .build();

        let err = catalog.get_columns("myapp.orders").await.unwrap_err();
        assert!(matches!(err, CatalogError::ConnectionFailed(_)));
        assert!(!err.is_not_found());
        assert!(catalog.get_columns("users").await.is_ok());
        assert_eq!(
            catalog.list_functions().await.unwrap_err(),
            CatalogError::QueryTimeout(5)
        );
    }
}
