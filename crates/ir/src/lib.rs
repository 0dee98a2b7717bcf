// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlscope - shared vocabulary
//!
//! Types shared by every layer of the semantic model builder:
//!
//! - [`Dialect`] and the [`DialectCapabilities`] record handed to the recognizer
//!   (grammar rule names, identifier rules, clause support)
//! - [`Identifier`] / [`QualifiedName`] with dialect-aware comparison keys
//! - [`TextInterval`] / [`ScopeInterval`] and the pure [`compute_scope_interval`]
//!   boundary rule used for lexical scopes
//! - schema metadata returned by catalogs ([`TableMetadata`], [`ColumnMetadata`], ...)

pub mod dialect;
pub mod interval;
pub mod metadata;
pub mod names;

pub use dialect::{
    CaseFolding, ClauseExtension, Dialect, DialectCapabilities, DialectFamily, IdentifierRules,
    ParseDialectError, RuleNames,
};
pub use interval::{ScopeEnd, ScopeInterval, TextInterval, UNBOUNDED, compute_scope_interval};
pub use metadata::{ColumnMetadata, DataType, FunctionMetadata, FunctionType, TableMetadata, TableType};
pub use names::{Identifier, QualifiedName};
