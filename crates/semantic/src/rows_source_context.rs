// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Rows source context
//!
//! The namespace of row sources (tables, aliases, derived tables) visible at
//! a point of a statement, as established by the structural pass.
//!
//! Contexts are immutable snapshots backed by an `Arc`. Extending one with
//! [`RowsSourceContext::with_source`] produces a new snapshot; cloning shares
//! storage, so an unchanged context stays pointer-equal to its origin.
//!
//! ## Combine
//!
//! `combine(A, B)` is the namespace visible to a clause depending on both A
//! and B:
//!
//! - `combine(empty, X) == X` and `combine(X, empty) == X`
//! - `combine(X, X)` returns `X` itself
//! - otherwise the sources of A followed by those of B not already in A

use serde::Serialize;
use sqlscope_ir::{Identifier, QualifiedName, TextInterval};
use std::sync::Arc;

/// What kind of row source a binding names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    /// A catalog table or view
    Table,
    /// A subquery in FROM
    Derived,
}

/// One visible row source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceBinding {
    /// Name usable as a qualifier: the alias, or the table name without one
    pub name: Option<Identifier>,
    /// Catalog object for table sources
    pub object: Option<QualifiedName>,
    pub kind: SourceKind,
    /// Query nesting level the source was introduced at
    pub level: usize,
    /// Where the source is written
    pub interval: TextInterval,
}

impl SourceBinding {
    /// Binding for a table reference
    pub fn table(object: QualifiedName, alias: Option<Identifier>, interval: TextInterval) -> Self {
        let name = alias.or_else(|| object.name().cloned());
        Self {
            name,
            object: Some(object),
            kind: SourceKind::Table,
            level: 0,
            interval,
        }
    }

    /// Binding for a derived table
    pub fn derived(alias: Option<Identifier>, interval: TextInterval) -> Self {
        Self {
            name: alias,
            object: None,
            kind: SourceKind::Derived,
            level: 0,
            interval,
        }
    }

    /// Check if `qualifier` (one or more name parts) refers to this source
    ///
    /// A single part matches the visible name. Several parts match the
    /// catalog object of an unaliased table (`schema.table`).
    pub fn matches(&self, qualifier: &[Identifier]) -> bool {
        match qualifier {
            [] => false,
            [single] => self.name.as_ref().is_some_and(|n| n.matches(single)),
            parts => {
                let aliased = self.name.as_ref() != self.object.as_ref().and_then(|o| o.name());
                !aliased
                    && self
                        .object
                        .as_ref()
                        .is_some_and(|o| o.matches_suffix(&QualifiedName::new(parts.to_vec())))
            }
        }
    }
}

/// Immutable, combinable namespace of visible row sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowsSourceContext {
    sources: Arc<Vec<SourceBinding>>,
    level: usize,
}

impl RowsSourceContext {
    /// The empty context (identity of [`combine`](Self::combine))
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    /// Current query nesting level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Same sources, one query level deeper (for subqueries)
    pub fn nested(&self) -> Self {
        Self {
            sources: Arc::clone(&self.sources),
            level: self.level + 1,
        }
    }

    /// New context with `source` added at the current level
    pub fn with_source(&self, mut source: SourceBinding) -> Self {
        source.level = self.level;
        let mut sources = Vec::with_capacity(self.sources.len() + 1);
        sources.extend(self.sources.iter().cloned());
        sources.push(source);
        Self {
            sources: Arc::new(sources),
            level: self.level,
        }
    }

    /// Check if both contexts share the same storage
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.sources, &b.sources) && a.level == b.level
    }

    /// Merge two contexts into the namespace visible to a dependent clause
    pub fn combine(a: &Self, b: &Self) -> Self {
        Self {
            sources: combine_shared(&a.sources, &b.sources),
            level: a.level.max(b.level),
        }
    }

    /// Innermost source matching `qualifier`
    pub fn find(&self, qualifier: &[Identifier]) -> Option<&SourceBinding> {
        self.sources.iter().rev().find(|s| s.matches(qualifier))
    }

    /// The only source introduced at the current level, if there is exactly one
    pub fn sole_source(&self) -> Option<&SourceBinding> {
        let mut local = self.sources.iter().filter(|s| s.level == self.level);
        match (local.next(), local.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// `a ++ (b \ a)` with the identity and sharing rules of `combine`
pub(crate) fn combine_shared<T: PartialEq + Clone>(a: &Arc<Vec<T>>, b: &Arc<Vec<T>>) -> Arc<Vec<T>> {
    if a.is_empty() {
        return Arc::clone(b);
    }
    if b.is_empty() || Arc::ptr_eq(a, b) {
        return Arc::clone(a);
    }
    let extra: Vec<&T> = b.iter().filter(|item| !a.contains(item)).collect();
    if extra.is_empty() {
        return Arc::clone(a);
    }
    let mut merged = Vec::with_capacity(a.len() + extra.len());
    merged.extend(a.iter().cloned());
    merged.extend(extra.into_iter().cloned());
    Arc::new(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Identifier {
        Identifier::new(s)
    }

    fn table(name: &str, alias: Option<&str>, at: usize) -> SourceBinding {
        SourceBinding::table(
            QualifiedName::simple(ident(name)),
            alias.map(ident),
            TextInterval::new(at, at + name.len()),
        )
    }

    #[test]
    fn test_combine_identity() {
        let x = RowsSourceContext::empty().with_source(table("users", None, 0));
        let empty = RowsSourceContext::empty();

        assert_eq!(RowsSourceContext::combine(&empty, &x), x);
        assert_eq!(RowsSourceContext::combine(&x, &empty), x);
        assert!(RowsSourceContext::ptr_eq(
            &RowsSourceContext::combine(&x, &x),
            &x
        ));
    }

    #[test]
    fn test_combine_deduplicates() {
        let base = RowsSourceContext::empty().with_source(table("t", None, 7));
        let a = base.with_source(table("a", None, 20));
        let b = base.with_source(table("b", None, 30));

        let combined = RowsSourceContext::combine(&a, &b);
        let names: Vec<_> = combined
            .sources()
            .iter()
            .filter_map(|s| s.name.as_ref().map(|n| n.text.clone()))
            .collect();
        assert_eq!(names, vec!["t", "a", "b"]);

        // repeated combination is stable and leaves the operands untouched
        assert_eq!(RowsSourceContext::combine(&combined, &b), combined);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_alias_hides_table_name() {
        let ctx = RowsSourceContext::empty().with_source(table("users", Some("u"), 0));
        assert!(ctx.find(&[ident("U")]).is_some());
        assert!(ctx.find(&[ident("users")]).is_none());
        assert!(ctx.find(&[ident("public"), ident("users")]).is_none());
    }

    #[test]
    fn test_schema_qualified_match() {
        let binding = SourceBinding::table(
            QualifiedName::new(vec![ident("public"), ident("users")]),
            None,
            TextInterval::new(0, 12),
        );
        let ctx = RowsSourceContext::empty().with_source(binding);
        assert!(ctx.find(&[ident("public"), ident("users")]).is_some());
        assert!(ctx.find(&[ident("users")]).is_some());
    }

    #[test]
    fn test_sole_source_per_level() {
        let outer = RowsSourceContext::empty()
            .with_source(table("a", None, 0))
            .with_source(table("b", None, 5));
        assert!(outer.sole_source().is_none());

        let inner = outer.nested().with_source(table("c", None, 20));
        assert_eq!(
            inner.sole_source().and_then(|s| s.name.clone()),
            Some(ident("c"))
        );
        assert_eq!(inner.level(), 1);
    }

    #[test]
    fn test_with_source_does_not_mutate() {
        let a = RowsSourceContext::empty().with_source(table("a", None, 0));
        let b = a.with_source(table("b", None, 4));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert!(!RowsSourceContext::ptr_eq(&a, &b));
        assert!(RowsSourceContext::ptr_eq(&a, &a.clone()));
    }
}
