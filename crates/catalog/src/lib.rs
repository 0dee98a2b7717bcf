// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlscope - Catalog Layer
//!
//! Schema metadata for the data pass of the semantic model builder.
//!
//! - [`Catalog`]: async provider of tables, columns and functions
//! - [`StaticCatalog`]: in-memory provider, built in code or from YAML
//! - [`MetadataCache`]: synchronous snapshot the recognizers read
//!
//! ## Implementing the Catalog Trait
//!
//! ```rust,ignore
//! use sqlscope_catalog::{Catalog, CatalogResult};
//! use sqlscope_ir::{ColumnMetadata, FunctionMetadata, TableMetadata};
//! use async_trait::async_trait;
//!
//! struct MyCatalog;
//!
//! #[async_trait]
//! impl Catalog for MyCatalog {
//!     async fn list_tables(&self) -> CatalogResult<Vec<TableMetadata>> {
//!         // Your implementation here
//!     }
//!
//!     async fn get_columns(&self, table: &str) -> CatalogResult<Vec<ColumnMetadata>> {
//!         // Your implementation here
//!     }
//!
//!     async fn list_functions(&self) -> CatalogResult<Vec<FunctionMetadata>> {
//!         // Your implementation here
//!     }
//! }
//! ```

pub mod cache;
pub mod error;
pub mod r#static;
pub mod r#trait;

// Re-exports
pub use cache::{MetadataCache, TableLookup};
pub use error::{CatalogError, CatalogResult};
pub use r#static::StaticCatalog;
pub use r#trait::Catalog;
