// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Rows data context
//!
//! Row sources paired with their columns, as established by the data pass.
//! Same snapshot and combine rules as
//! [`RowsSourceContext`](crate::RowsSourceContext).

use crate::error::{SemanticError, SemanticResult};
use crate::rows_source_context::combine_shared;
use crate::symbol::{ColumnSymbol, TableSymbol};
use sqlscope_ir::Identifier;
use std::sync::Arc;

/// Immutable, combinable set of tables with columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowsDataContext {
    tables: Arc<Vec<TableSymbol>>,
    level: usize,
}

impl RowsDataContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> &[TableSymbol] {
        &self.tables
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Same tables, one query level deeper
    pub fn nested(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            level: self.level + 1,
        }
    }

    /// New context with `table` added at the current level
    pub fn with_table(&self, table: TableSymbol) -> Self {
        let table = table.with_level(self.level);
        let mut tables = Vec::with_capacity(self.tables.len() + 1);
        tables.extend(self.tables.iter().cloned());
        tables.push(table);
        Self {
            tables: Arc::new(tables),
            level: self.level,
        }
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.tables, &b.tables) && a.level == b.level
    }

    /// Merge two contexts; see [`RowsSourceContext::combine`](crate::RowsSourceContext::combine)
    pub fn combine(a: &Self, b: &Self) -> Self {
        Self {
            tables: combine_shared(&a.tables, &b.tables),
            level: a.level.max(b.level),
        }
    }

    /// Innermost table matching `qualifier`
    pub fn find_table(&self, qualifier: &[Identifier]) -> Option<&TableSymbol> {
        self.tables.iter().rev().find(|t| t.matches(qualifier))
    }

    /// Whether some table's columns are unknown
    pub fn is_name_only(&self) -> bool {
        self.tables.iter().any(|t| !t.columns_known)
    }

    /// All columns, innermost tables first
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnSymbol> {
        self.tables.iter().rev().flat_map(|t| t.columns.iter())
    }

    /// Resolve a column reference
    ///
    /// Returns `Ok(None)` when the answer cannot be determined because the
    /// columns of a candidate table are unknown.
    ///
    /// Unqualified names are looked up level by level from the innermost
    /// query outwards; two matches on the same level are ambiguous.
    pub fn resolve_column(
        &self,
        qualifier: &[Identifier],
        column: &Identifier,
    ) -> SemanticResult<Option<ColumnSymbol>> {
        if !qualifier.is_empty() {
            return self.resolve_qualified(qualifier, column);
        }

        let mut levels: Vec<usize> = self.tables.iter().map(|t| t.level).collect();
        levels.sort_unstable();
        levels.dedup();

        for level in levels.into_iter().rev() {
            let tables: Vec<&TableSymbol> =
                self.tables.iter().filter(|t| t.level == level).collect();
            let found: Vec<(&TableSymbol, &ColumnSymbol)> = tables
                .iter()
                .filter_map(|t| t.find_column(column).map(|c| (*t, c)))
                .collect();

            match found.as_slice() {
                [(_, only)] => return Ok(Some((*only).clone())),
                [] => {}
                many => {
                    let names = many
                        .iter()
                        .map(|(t, _)| t.display_name().to_string())
                        .collect();
                    return Err(SemanticError::AmbiguousColumn(column.text.clone(), names));
                }
            }

            // the column may hide in a table we know nothing about
            let unknown: Vec<&&TableSymbol> = tables.iter().filter(|t| !t.columns_known).collect();
            match unknown.as_slice() {
                [] => {}
                [only] => {
                    return Ok(Some(ColumnSymbol::untyped(column.clone(), only.name.clone())));
                }
                _ => return Ok(None),
            }
        }

        Err(SemanticError::ColumnNotFound(column.text.clone()))
    }

    fn resolve_qualified(
        &self,
        qualifier: &[Identifier],
        column: &Identifier,
    ) -> SemanticResult<Option<ColumnSymbol>> {
        let qualifier_text = qualifier
            .iter()
            .map(|q| q.text.as_str())
            .collect::<Vec<_>>()
            .join(".");
        let table = self
            .find_table(qualifier)
            .ok_or_else(|| SemanticError::UnknownQualifier(qualifier_text.clone()))?;

        if let Some(found) = table.find_column(column) {
            return Ok(Some(found.clone()));
        }
        if !table.columns_known {
            return Ok(Some(ColumnSymbol::untyped(column.clone(), table.name.clone())));
        }
        Err(SemanticError::ColumnNotFound(format!("{qualifier_text}.{}", column.text)))
    }
}
