// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata cache
//!
//! Synchronously readable snapshot of catalog answers. The analyzer fills it
//! through the async [`Catalog`] between the structural pass and the data
//! pass; recognizers only ever read it.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{Catalog, CatalogError, CatalogResult};
use sqlscope_ir::{ColumnMetadata, FunctionMetadata, QualifiedName};

/// Result of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLookup<'a> {
    /// The catalog reported these columns
    Found(&'a [ColumnMetadata]),
    /// The catalog reported that the table does not exist
    Missing,
    /// The table was never requested (or the request failed)
    NotFetched,
}

/// Cached table columns and function list
#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    /// lookup key -> columns, `None` when the catalog reported the table missing
    tables: HashMap<String, Option<Vec<ColumnMetadata>>>,
    functions: Option<Vec<FunctionMetadata>>,
    default_schema: Option<String>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: qualify unqualified names with `schema`
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// Cache key of a table name
    fn key(&self, name: &QualifiedName) -> String {
        match (&self.default_schema, name.parts.len()) {
            (Some(schema), 1) => format!("{}.{}", schema.to_lowercase(), name.key()),
            _ => name.key(),
        }
    }

    /// Name sent to the catalog for a table
    fn request(&self, name: &QualifiedName) -> String {
        match (&self.default_schema, name.parts.len()) {
            (Some(schema), 1) => format!("{schema}.{name}"),
            _ => name.to_string(),
        }
    }

    /// Look up a table
    pub fn lookup(&self, name: &QualifiedName) -> TableLookup<'_> {
        match self.tables.get(&self.key(name)) {
            Some(Some(columns)) => TableLookup::Found(columns),
            Some(None) => TableLookup::Missing,
            None => TableLookup::NotFetched,
        }
    }

    pub fn is_cached(&self, name: &QualifiedName) -> bool {
        self.tables.contains_key(&self.key(name))
    }

    pub fn insert_table(&mut self, name: &QualifiedName, columns: Vec<ColumnMetadata>) {
        let key = self.key(name);
        self.tables.insert(key, Some(columns));
    }

    pub fn mark_missing(&mut self, name: &QualifiedName) {
        let key = self.key(name);
        self.tables.insert(key, None);
    }

    pub fn set_functions(&mut self, functions: Vec<FunctionMetadata>) {
        self.functions = Some(functions);
    }

    /// Find a function by name (case-insensitive)
    pub fn function(&self, name: &str) -> Option<&FunctionMetadata> {
        self.functions
            .as_ref()?
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn has_functions(&self) -> bool {
        self.functions.is_some()
    }

    /// Number of cached table entries, missing ones included
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Fetch columns for every name not cached yet
    ///
    /// Tables the catalog does not know are cached as missing. Other failures
    /// leave the table uncached and are returned so the caller can report them.
    pub async fn prefetch_tables<'n>(
        &mut self,
        catalog: &dyn Catalog,
        names: impl IntoIterator<Item = &'n QualifiedName>,
    ) -> Vec<(QualifiedName, CatalogError)> {
        let mut failures = Vec::new();
        for name in names {
            if name.is_empty() || self.is_cached(name) {
                continue;
            }
            let request = self.request(name);
            match catalog.get_columns(&request).await {
                Ok(columns) => {
                    debug!(table = %request, columns = columns.len(), "Cached table metadata");
                    self.insert_table(name, columns);
                }
                Err(err) if err.is_not_found() => {
                    debug!(table = %request, "Table not found in catalog");
                    self.mark_missing(name);
                }
                Err(err) => {
                    warn!(table = %request, error = %err, "Failed to fetch table metadata");
                    failures.push((name.clone(), err));
                }
            }
        }
        failures
    }

    /// Fetch the function list once
    pub async fn prefetch_functions(&mut self, catalog: &dyn Catalog) -> CatalogResult<()> {
        if self.functions.is_some() {
            return Ok(());
        }
        let functions = catalog.list_functions().await?;
        debug!(functions = functions.len(), "Cached function metadata");
        self.functions = Some(functions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCatalog;
    use sqlscope_ir::{DataType, Identifier, TableMetadata};

    fn name(parts: &[&str]) -> QualifiedName {
        QualifiedName::new(parts.iter().map(|p| Identifier::new(*p)).collect())
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            TableMetadata::new("users", "public")
                .with_columns(vec![ColumnMetadata::new("id", DataType::Integer)]),
        ])
    }

    #[tokio::test]
    async fn test_prefetch_found_and_missing() {
        let mut cache = MetadataCache::new();
        let users = name(&["Users"]);
        let ghosts = name(&["ghosts"]);
        let failures = cache.prefetch_tables(&catalog(), [&users, &ghosts]).await;

        assert!(failures.is_empty());
        assert!(matches!(cache.lookup(&name(&["users"])), TableLookup::Found(cols) if cols.len() == 1));
        assert_eq!(cache.lookup(&ghosts), TableLookup::Missing);
        assert_eq!(cache.lookup(&name(&["orders"])), TableLookup::NotFetched);
        assert_eq!(cache.table_count(), 2);
    }

    #[tokio::test]
    async fn test_default_schema_key() {
        let mut cache = MetadataCache::new().with_default_schema("public");
        cache.prefetch_tables(&catalog(), [&name(&["users"])]).await;
        assert!(matches!(
            cache.lookup(&name(&["public", "users"])),
            TableLookup::Found(_)
        ));
    }

    struct BrokenCatalog;

    #[async_trait::async_trait]
    impl Catalog for BrokenCatalog {
        async fn list_tables(&self) -> CatalogResult<Vec<TableMetadata>> {
            Err(CatalogError::ConnectionFailed("down".to_string()))
        }

        async fn get_columns(&self, _table: &str) -> CatalogResult<Vec<ColumnMetadata>> {
            Err(CatalogError::QueryTimeout(3))
        }

        async fn list_functions(&self) -> CatalogResult<Vec<FunctionMetadata>> {
            Err(CatalogError::ConnectionFailed("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_transport_failures_are_reported() {
        let mut cache = MetadataCache::new();
        let users = name(&["users"]);
        let failures = cache.prefetch_tables(&BrokenCatalog, [&users]).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(cache.lookup(&users), TableLookup::NotFetched);
        assert!(cache.prefetch_functions(&BrokenCatalog).await.is_err());
        assert!(!cache.has_functions());
    }

    #[tokio::test]
    async fn test_function_lookup() {
        let mut cache = MetadataCache::new();
        cache
            .prefetch_functions(&StaticCatalog::playground())
            .await
            .unwrap();
        assert_eq!(
            cache.function("COUNT").map(|f| f.return_type.clone()),
            Some(DataType::BigInt)
        );
        assert!(cache.function("nope").is_none());
    }
}
