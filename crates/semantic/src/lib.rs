// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # sqlscope - Semantic Model Layer
//!
//! Builds a semantic model of SQL statements from a parsed syntax tree and
//! answers "which names are visible here" for any text offset.
//!
//! ## Overview
//!
//! - **Recognition**: [`statement::recognize`] maps a statement node to a
//!   [`StatementModel`] holding row sources, value expressions and the
//!   lexical scopes opened by each clause
//! - **Resolution**: two passes bind names. The structural pass builds a
//!   [`RowsSourceContext`]; the data pass builds a [`RowsDataContext`] with
//!   typed columns and gives every scope its [`SymbolOrigin`]
//! - **Scripts**: [`SemanticAnalyzer`] runs both passes over a document,
//!   fetching table metadata from a [`Catalog`](sqlscope_catalog::Catalog)
//!   in between
//!
//! Problems in the SQL text never fail analysis. They are recorded as
//! [`Diagnostic`]s and the model covers whatever could be recognized.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlscope_semantic::{AnalyzerConfig, ScriptItem, SemanticAnalyzer};
//!
//! let mut analyzer = SemanticAnalyzer::new(AnalyzerConfig::default()).with_catalog(catalog);
//! let script = analyzer.analyze_script(&[ScriptItem::new(tree, 0, "UPDATE t SET a = 1")]).await;
//!
//! // Cursor right after `SET `: only the columns of `t` are offered
//! for symbol in script.symbols_visible_at(13) {
//!     println!("{}", symbol.name());
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod rows_data_context;
pub mod rows_source;
pub mod rows_source_context;
pub mod scope;
pub mod statement;
pub mod symbol;

// Re-export commonly used types
pub use analyzer::{ScriptEntry, ScriptItem, ScriptModel, SemanticAnalyzer, build_model};
pub use config::{AnalyzerConfig, ConfigError, DEFAULT_MAX_RECURSION_DEPTH, SETTINGS_SECTION};
pub use context::{ExecutionContext, RecognitionContext};
pub use diagnostics::{Diagnostic, DiagnosticKind, RecognitionStatistics, Severity};
pub use error::{SemanticError, SemanticResult};
pub use expression::{ColumnReference, ExpressionKind, ValueExpression};
pub use rows_data_context::RowsDataContext;
pub use rows_source::{JoinCondition, JoinConditionKind, RowsSourceKind, RowsSourceModel};
pub use rows_source_context::{RowsSourceContext, SourceBinding, SourceKind};
pub use scope::{LexicalScope, ScopeId, ScopeRole, ScopeTree, SymbolOrigin, VisibleSymbol};
pub use statement::{StatementBody, StatementModel};
pub use symbol::{ColumnSymbol, TableSymbol};
