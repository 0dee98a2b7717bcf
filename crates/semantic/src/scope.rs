// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Lexical scopes
//!
//! A lexical scope is a text interval tagged with the origin of the symbols
//! visible inside it. Scopes of one statement live in a [`ScopeTree`] arena;
//! nested scopes (assignment values, join conditions, subquery clauses) point
//! at their parent.
//!
//! Sibling scopes never overlap, so [`ScopeTree::scope_at`] finds at most one
//! scope per nesting level and returns the innermost.

use crate::rows_data_context::RowsDataContext;
use serde::Serialize;
use sqlscope_ir::{DataType, Identifier, QualifiedName, ScopeEnd, ScopeInterval, compute_scope_interval};

/// Index of a scope in its [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub usize);

/// Clause a scope belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeRole {
    /// UPDATE/INSERT/DELETE target table
    TableReferences,
    /// SELECT list
    Projection,
    /// FROM list, UPDATE ... FROM, DELETE ... USING
    Sources,
    /// UPDATE SET list
    AssignmentTargets,
    /// Right-hand side of one SET assignment
    AssignmentValue,
    /// INSERT column list
    InsertColumns,
    /// INSERT VALUES rows
    InsertValues,
    /// WHERE (and ORDER BY of UPDATE/DELETE)
    Conditions,
    /// GROUP BY
    Grouping,
    /// HAVING
    Having,
    /// SELECT ORDER BY
    Ordering,
    /// LIMIT / OFFSET
    Limit,
    /// JOIN ... ON / USING
    JoinCondition,
    /// Statement the recognizer could not classify
    Fragment,
}

/// Provenance of the symbols visible in a scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SymbolOrigin {
    /// Nothing is offered
    #[default]
    Empty,
    /// Columns of the context plus its source names as qualifiers
    SyntaxBasedFromRowsData(RowsDataContext),
    /// Only the columns of the context
    RowsDataRef(RowsDataContext),
}

impl SymbolOrigin {
    pub fn is_empty(&self) -> bool {
        matches!(self, SymbolOrigin::Empty)
    }

    /// Backing data context, if any
    pub fn data(&self) -> Option<&RowsDataContext> {
        match self {
            SymbolOrigin::Empty => None,
            SymbolOrigin::SyntaxBasedFromRowsData(ctx) | SymbolOrigin::RowsDataRef(ctx) => Some(ctx),
        }
    }

    /// Symbols a completion consumer may offer
    ///
    /// Syntax-based origins list the named sources first, then columns from
    /// the innermost query outwards. Column names shadowed by an inner level
    /// are listed once.
    pub fn visible_symbols(&self) -> Vec<VisibleSymbol> {
        let (data, with_sources) = match self {
            SymbolOrigin::Empty => return Vec::new(),
            SymbolOrigin::SyntaxBasedFromRowsData(data) => (data, true),
            SymbolOrigin::RowsDataRef(data) => (data, false),
        };
        let mut symbols = Vec::new();
        if with_sources {
            for table in data.tables().iter().rev() {
                if let Some(name) = &table.name {
                    symbols.push(VisibleSymbol::Source {
                        name: name.clone(),
                        object: table.object.clone(),
                    });
                }
            }
        }
        for column in data.visible_columns() {
            let seen = symbols.iter().any(|s| match s {
                VisibleSymbol::Column { name, table, .. } => {
                    name == &column.name && table == &column.table
                }
                VisibleSymbol::Source { .. } => false,
            });
            if !seen {
                symbols.push(VisibleSymbol::Column {
                    name: column.name.clone(),
                    table: column.table.clone(),
                    data_type: column.data_type.clone(),
                });
            }
        }
        symbols
    }
}

/// A name offered at a cursor position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VisibleSymbol {
    /// Table, view or derived table usable as a qualifier
    Source {
        name: Identifier,
        object: Option<QualifiedName>,
    },
    Column {
        name: Identifier,
        table: Option<Identifier>,
        data_type: Option<DataType>,
    },
}

impl VisibleSymbol {
    pub fn name(&self) -> &Identifier {
        match self {
            VisibleSymbol::Source { name, .. } | VisibleSymbol::Column { name, .. } => name,
        }
    }
}

/// One lexical scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalScope {
    pub id: ScopeId,
    pub role: ScopeRole,
    pub interval: ScopeInterval,
    pub origin: SymbolOrigin,
    pub parent: Option<ScopeId>,
    /// Takes its origin from the preceding statement's tail scope
    pub adopts_tail: bool,
}

/// Arena of the scopes of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    scopes: Vec<LexicalScope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope and return its id
    pub fn add(&mut self, role: ScopeRole, interval: ScopeInterval, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(LexicalScope {
            id,
            role,
            interval,
            origin: SymbolOrigin::Empty,
            parent,
            adopts_tail: false,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&LexicalScope> {
        self.scopes.get(id.0)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut LexicalScope> {
        self.scopes.get_mut(id.0)
    }

    pub fn set_origin(&mut self, id: ScopeId, origin: SymbolOrigin) {
        if let Some(scope) = self.scopes.get_mut(id.0) {
            scope.origin = origin;
        }
    }

    /// Reset one scope's origin to `Empty`
    pub fn reset(&mut self, id: ScopeId) {
        self.set_origin(id, SymbolOrigin::Empty);
    }

    /// Reset every origin to `Empty`
    pub fn reset_origins(&mut self) {
        for scope in &mut self.scopes {
            scope.origin = SymbolOrigin::Empty;
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LexicalScope> {
        self.scopes.iter()
    }

    /// Direct children of `parent` (`None` for root scopes)
    pub fn children(&self, parent: Option<ScopeId>) -> impl Iterator<Item = &LexicalScope> {
        self.scopes.iter().filter(move |s| s.parent == parent)
    }

    /// Innermost scope containing `offset`
    pub fn scope_at(&self, offset: usize) -> Option<&LexicalScope> {
        let mut current = self.children(None).find(|s| s.interval.contains(offset))?;
        while let Some(inner) = self
            .children(Some(current.id))
            .find(|s| s.interval.contains(offset))
        {
            current = inner;
        }
        Some(current)
    }

    /// Check that no two sibling scopes overlap
    pub fn siblings_disjoint(&self) -> bool {
        self.scopes.iter().enumerate().all(|(i, a)| {
            self.scopes[i + 1..]
                .iter()
                .filter(|b| b.parent == a.parent)
                .all(|b| !a.interval.overlaps(&b.interval))
        })
    }
}

/// One clause group laid out on the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClauseSegment {
    pub role: ScopeRole,
    /// Where the clause node starts; bounds the preceding scope
    pub node_start: usize,
    /// End of the introducing keyword, or the node start when the keyword is missing
    pub scope_start: usize,
}

impl ClauseSegment {
    pub fn new(role: ScopeRole, node_start: usize, keyword_end: Option<usize>) -> Self {
        Self {
            role,
            node_start,
            scope_start: keyword_end.unwrap_or(node_start),
        }
    }
}

/// Intervals of consecutive clause scopes
///
/// Each scope runs from its own start to the next segment's node start; the
/// last one runs to `closing`.
pub(crate) fn layout_scopes(segments: &[ClauseSegment], closing: ScopeEnd) -> Vec<ScopeInterval> {
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let next = segments
                .get(i + 1)
                .map_or(closing, |n| ScopeEnd::Bounded(n.node_start));
            compute_scope_interval(seg.scope_start, next)
        })
        .collect()
}

/// Scope ids of the clause groups of one statement
#[derive(Debug, Clone, Default)]
pub(crate) struct ClauseScopes(Vec<(ScopeRole, ScopeId)>);

impl ClauseScopes {
    pub fn get(&self, role: ScopeRole) -> Option<ScopeId> {
        self.0.iter().find(|(r, _)| *r == role).map(|(_, id)| *id)
    }
}

/// Add one scope per segment, in text order, under `parent`
pub(crate) fn open_clause_scopes(
    scopes: &mut ScopeTree,
    mut segments: Vec<ClauseSegment>,
    parent: Option<ScopeId>,
    closing: ScopeEnd,
) -> ClauseScopes {
    segments.sort_by_key(|s| s.node_start);
    let intervals = layout_scopes(&segments, closing);
    ClauseScopes(
        segments
            .iter()
            .zip(intervals)
            .map(|(seg, interval)| (seg.role, scopes.add(seg.role, interval, parent)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_ir::UNBOUNDED;

    fn bounded(start: usize, end: usize) -> ScopeInterval {
        compute_scope_interval(start, ScopeEnd::Bounded(end))
    }

    #[test]
    fn test_scope_at_descends() {
        // UPDATE t SET a=1, b=2 WHERE c=3
        let mut tree = ScopeTree::new();
        let targets = tree.add(ScopeRole::AssignmentTargets, bounded(12, 22), None);
        tree.add(ScopeRole::AssignmentValue, bounded(15, 16), Some(targets));
        tree.add(ScopeRole::AssignmentValue, bounded(20, 22), Some(targets));
        tree.add(ScopeRole::Conditions, compute_scope_interval(27, UNBOUNDED), None);

        assert_eq!(tree.scope_at(13).map(|s| s.role), Some(ScopeRole::AssignmentTargets));
        assert_eq!(tree.scope_at(15).map(|s| s.role), Some(ScopeRole::AssignmentValue));
        assert_eq!(tree.scope_at(25), None);
        assert_eq!(tree.scope_at(500).map(|s| s.role), Some(ScopeRole::Conditions));
        assert!(tree.siblings_disjoint());
    }

    #[test]
    fn test_overlapping_siblings_detected() {
        let mut tree = ScopeTree::new();
        tree.add(ScopeRole::Projection, bounded(6, 20), None);
        tree.add(ScopeRole::Sources, bounded(15, 30), None);
        assert!(!tree.siblings_disjoint());
    }

    #[test]
    fn test_reset_origins() {
        let mut tree = ScopeTree::new();
        let id = tree.add(ScopeRole::Conditions, bounded(0, 5), None);
        tree.set_origin(id, SymbolOrigin::RowsDataRef(RowsDataContext::empty()));
        assert!(tree.get(id).is_some_and(|s| !s.origin.is_empty()));
        tree.reset_origins();
        assert!(tree.iter().all(|s| s.origin.visible_symbols().is_empty()));
        assert_eq!(tree.get(id).map(|s| s.origin.clone()), Some(SymbolOrigin::Empty));
    }

    #[test]
    fn test_layout_scopes() {
        let segments = [
            ClauseSegment::new(ScopeRole::AssignmentTargets, 9, Some(12)),
            ClauseSegment::new(ScopeRole::Conditions, 22, Some(27)),
        ];
        let intervals = layout_scopes(&segments, UNBOUNDED);
        assert_eq!(intervals[0], bounded(12, 22));
        assert_eq!(intervals[1], compute_scope_interval(27, UNBOUNDED));

        // missing keyword: scope starts at the clause node
        let segments = [ClauseSegment::new(ScopeRole::Conditions, 10, None)];
        assert_eq!(layout_scopes(&segments, ScopeEnd::Bounded(18))[0], bounded(10, 18));
    }

    #[test]
    fn test_open_clause_scopes_sorts_segments() {
        let mut tree = ScopeTree::new();
        let segments = vec![
            ClauseSegment::new(ScopeRole::Conditions, 22, Some(27)),
            ClauseSegment::new(ScopeRole::AssignmentTargets, 9, Some(12)),
        ];
        let opened = open_clause_scopes(&mut tree, segments, None, UNBOUNDED);
        let targets = opened.get(ScopeRole::AssignmentTargets).unwrap();
        assert_eq!(tree.get(targets).map(|s| s.interval), Some(bounded(12, 22)));
        assert_eq!(opened.get(ScopeRole::Limit), None);
    }
}
