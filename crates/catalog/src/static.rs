// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static Catalog
//!
//! In-memory catalog built from code or from a YAML schema file:
//!
//! ```yaml
//! schema: playground
//! tables:
//!   - name: users
//!     columns:
//!       - { name: id, type: integer, primaryKey: true }
//!       - { name: email, type: varchar(255), nullable: true }
//! functions:
//!   - { name: count, returns: bigint, kind: aggregate }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::{Catalog, CatalogError, CatalogResult};
use sqlscope_ir::{
    ColumnMetadata, DataType, FunctionMetadata, FunctionType, TableMetadata, TableType,
};

/// Static catalog with predefined schema data
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: Vec<TableMetadata>,
    functions: Vec<FunctionMetadata>,
}

impl StaticCatalog {
    pub fn new(tables: Vec<TableMetadata>) -> Self {
        Self {
            tables,
            functions: Vec::new(),
        }
    }

    /// Builder method: set functions
    pub fn with_functions(mut self, functions: Vec<FunctionMetadata>) -> Self {
        self.functions = functions;
        self
    }

    /// Small shop schema (users, orders, order_items) used by demos
    pub fn playground() -> Self {
        let users = TableMetadata::new("users", "playground").with_columns(vec![
            ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
            ColumnMetadata::new("name", DataType::Varchar(Some(100))),
            ColumnMetadata::new("email", DataType::Varchar(Some(255))),
            ColumnMetadata::new("created_at", DataType::Timestamp).with_nullable(true),
        ]);
        let orders = TableMetadata::new("orders", "playground").with_columns(vec![
            ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
            ColumnMetadata::new("user_id", DataType::Integer),
            ColumnMetadata::new("total", DataType::Decimal),
            ColumnMetadata::new("status", DataType::Varchar(Some(20))).with_nullable(true),
            ColumnMetadata::new("created_at", DataType::Timestamp).with_nullable(true),
        ]);
        let order_items = TableMetadata::new("order_items", "playground").with_columns(vec![
            ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
            ColumnMetadata::new("order_id", DataType::Integer),
            ColumnMetadata::new("product_name", DataType::Varchar(Some(255))),
            ColumnMetadata::new("quantity", DataType::Integer),
            ColumnMetadata::new("price", DataType::Decimal),
        ]);
        Self::new(vec![users, orders, order_items]).with_functions(vec![
            FunctionMetadata::new("count", DataType::BigInt).with_type(FunctionType::Aggregate),
            FunctionMetadata::new("sum", DataType::Decimal).with_type(FunctionType::Aggregate),
            FunctionMetadata::new("now", DataType::Timestamp),
        ])
    }

    /// Parse a YAML schema document
    pub fn from_yaml_str(yaml: &str) -> CatalogResult<Self> {
        let file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| CatalogError::SerializationError(e.to_string()))?;
        Ok(file.into_catalog())
    }

    /// Load a YAML schema file
    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::SerializationError(format!("{}: {}", path.display(), e))
        })?;
        let catalog = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), tables = catalog.tables.len(), "Loaded static catalog");
        Ok(catalog)
    }

    /// Find a table by `name` or `schema.name` (case-insensitive)
    pub fn find_table(&self, table: &str) -> Option<&TableMetadata> {
        let (schema, name) = match table.rsplit_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, table),
        };
        self.tables.iter().find(|t| {
            t.name.eq_ignore_ascii_case(name)
                && schema.is_none_or(|s| t.schema.eq_ignore_ascii_case(s))
        })
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn list_tables(&self) -> CatalogResult<Vec<TableMetadata>> {
        Ok(self.tables.clone())
    }

    async fn get_columns(&self, table: &str) -> CatalogResult<Vec<ColumnMetadata>> {
        self.find_table(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| {
                let schema = table
                    .rsplit_once('.')
                    .map(|(schema, _)| schema.to_string())
                    .unwrap_or_default();
                CatalogError::TableNotFound(table.to_string(), schema)
            })
    }

    async fn list_functions(&self) -> CatalogResult<Vec<FunctionMetadata>> {
        Ok(self.functions.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaFile {
    #[serde(default = "default_schema_name")]
    schema: String,
    #[serde(default)]
    tables: Vec<TableEntry>,
    #[serde(default)]
    functions: Vec<FunctionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableEntry {
    name: String,
    schema: Option<String>,
    #[serde(default)]
    view: bool,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    primary_key: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionEntry {
    name: String,
    returns: String,
    #[serde(default)]
    kind: Option<String>,
}

fn default_schema_name() -> String {
    "public".to_string()
}

impl SchemaFile {
    fn into_catalog(self) -> StaticCatalog {
        let default_schema = self.schema;
        let tables = self
            .tables
            .into_iter()
            .map(|t| {
                let columns = t
                    .columns
                    .into_iter()
                    .map(|c| {
                        let column = ColumnMetadata::new(c.name, DataType::from_sql_name(&c.data_type))
                            .with_nullable(c.nullable);
                        if c.primary_key {
                            column.with_primary_key()
                        } else {
                            column
                        }
                    })
                    .collect();
                let table_type = if t.view { TableType::View } else { TableType::Table };
                TableMetadata::new(t.name, t.schema.unwrap_or_else(|| default_schema.clone()))
                    .with_columns(columns)
                    .with_type(table_type)
            })
            .collect();
        let functions = self
            .functions
            .into_iter()
            .map(|f| {
                let function_type = match f.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    Some("aggregate") => FunctionType::Aggregate,
                    Some("window") => FunctionType::Window,
                    Some("table") => FunctionType::Table,
                    _ => FunctionType::Scalar,
                };
                FunctionMetadata::new(f.name, DataType::from_sql_name(&f.returns))
                    .with_type(function_type)
            })
            .collect();
        StaticCatalog::new(tables).with_functions(functions)
    }
}
