// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Statement models
//!
//! [`recognize`] turns one statement node into a [`StatementModel`]: a closed
//! [`StatementBody`] over the supported statement kinds plus the arena of
//! lexical scopes its clauses open.
//!
//! Each clause group gets a scope that starts right after the keyword
//! introducing it and ends where the next recognized clause starts. The last
//! scope of a top-level statement is unbounded and becomes the tail scope.
//!
//! ## Resolution
//!
//! - [`StatementModel::resolve_object_and_rows_references`] binds names to
//!   row sources and returns the namespace the statement exposes
//! - [`StatementModel::resolve_value_relations`] binds columns with types and
//!   assigns every scope its symbol origin
//!
//! Both passes may run repeatedly; each run yields equal contexts.

pub mod delete;
pub mod fragment;
pub mod insert;
pub mod select;
pub mod update;

use crate::context::RecognitionContext;
use crate::diagnostics::DiagnosticKind;
use crate::expression::{ValueExpression, recognize_expression};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source::{RowsSourceModel, recognize_rows_source};
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{LexicalScope, ScopeId, ScopeTree, SymbolOrigin, VisibleSymbol};
use sqlscope_ir::{ClauseExtension, ScopeEnd, TextInterval, UNBOUNDED};
use sqlscope_syntax::{SyntaxNode, leading_keywords};
use tracing::{debug, instrument};

pub use delete::{DeleteModel, DeleteScopes};
pub use fragment::FragmentModel;
pub use insert::{InsertModel, InsertScopes, InsertSource};
pub use select::{SelectItem, SelectModel, SelectScopes, SetOperation};
pub use update::{Assignment, UpdateModel, UpdateScopes};

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    Select(SelectModel),
    Insert(InsertModel),
    Update(UpdateModel),
    Delete(DeleteModel),
    Fragment(FragmentModel),
}

impl StatementBody {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StatementBody::Select(_) => "SELECT",
            StatementBody::Insert(_) => "INSERT",
            StatementBody::Update(_) => "UPDATE",
            StatementBody::Delete(_) => "DELETE",
            StatementBody::Fragment(_) => "FRAGMENT",
        }
    }
}

/// Model of one script item
#[derive(Debug, Clone, PartialEq)]
pub struct StatementModel {
    pub interval: TextInterval,
    pub body: StatementBody,
    pub scopes: ScopeTree,
    /// Last, unbounded scope
    pub tail: Option<ScopeId>,
}

/// Recognize a statement node
///
/// Nodes that are not a known statement (or a wrapper around one) become a
/// [`FragmentModel`].
#[instrument(skip_all, fields(kind = node.kind()))]
pub fn recognize<N: SyntaxNode>(node: &N, ctx: &mut RecognitionContext) -> StatementModel {
    let rules = *ctx.rules();
    let mut scopes = ScopeTree::new();

    let statement = if rules.is_statement(node.kind()) {
        Some(node.clone())
    } else {
        node.children()
            .into_iter()
            .find(|c| rules.is_statement(c.kind()))
    };

    let body = match statement {
        Some(stmt) if stmt.kind() == rules.select_statement => {
            StatementBody::Select(select::recognize_select(&stmt, &mut scopes, None, UNBOUNDED, ctx))
        }
        Some(stmt) if stmt.kind() == rules.insert_statement => {
            StatementBody::Insert(insert::recognize_insert(&stmt, &mut scopes, UNBOUNDED, ctx))
        }
        Some(stmt) if stmt.kind() == rules.update_statement => {
            StatementBody::Update(update::recognize_update(&stmt, &mut scopes, UNBOUNDED, ctx))
        }
        Some(stmt) if stmt.kind() == rules.delete_statement => {
            StatementBody::Delete(delete::recognize_delete(&stmt, &mut scopes, UNBOUNDED, ctx))
        }
        _ => StatementBody::Fragment(fragment::recognize_fragment(node, &mut scopes, UNBOUNDED)),
    };

    let tail = scopes
        .children(None)
        .filter(|s| s.interval.is_unbounded())
        .map(|s| s.id)
        .last();

    let stats = ctx.statistics_mut();
    stats.statements += 1;
    stats.scopes += scopes.len();
    debug!(statement = body.kind_name(), scopes = scopes.len(), "Recognized statement");

    StatementModel {
        interval: node.interval(),
        body,
        scopes,
        tail,
    }
}

impl StatementModel {
    /// Structural pass
    #[instrument(skip_all, fields(statement = self.body.kind_name()))]
    pub fn resolve_object_and_rows_references(
        &mut self,
        outer: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) -> RowsSourceContext {
        if ctx.check_cancelled(self.interval.start) {
            return outer.clone();
        }
        match &mut self.body {
            StatementBody::Select(model) => model.resolve_object_and_rows_references(outer, ctx),
            StatementBody::Insert(model) => model.resolve_object_and_rows_references(outer, ctx),
            StatementBody::Update(model) => model.resolve_object_and_rows_references(outer, ctx),
            StatementBody::Delete(model) => model.resolve_object_and_rows_references(outer, ctx),
            StatementBody::Fragment(_) => outer.clone(),
        }
    }

    /// Data pass
    #[instrument(skip_all, fields(statement = self.body.kind_name()))]
    pub fn resolve_value_relations(
        &mut self,
        outer: &RowsDataContext,
        ctx: &mut RecognitionContext,
    ) -> RowsDataContext {
        if ctx.check_cancelled(self.interval.start) {
            return outer.clone();
        }
        let scopes = &mut self.scopes;
        match &mut self.body {
            StatementBody::Select(model) => model.resolve_value_relations(outer, scopes, ctx),
            StatementBody::Insert(model) => model.resolve_value_relations(outer, scopes, ctx),
            StatementBody::Update(model) => model.resolve_value_relations(outer, scopes, ctx),
            StatementBody::Delete(model) => model.resolve_value_relations(outer, scopes, ctx),
            StatementBody::Fragment(_) => outer.clone(),
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.body, StatementBody::Fragment(_))
    }

    /// Innermost scope containing the item-local `offset`
    pub fn scope_at(&self, offset: usize) -> Option<&LexicalScope> {
        self.scopes.scope_at(offset)
    }

    pub fn tail_scope(&self) -> Option<&LexicalScope> {
        self.tail.and_then(|id| self.scopes.get(id))
    }

    /// Symbols offered at the item-local `offset`
    pub fn symbols_visible_at(&self, offset: usize) -> Vec<VisibleSymbol> {
        self.scope_at(offset)
            .map(|s| s.origin.visible_symbols())
            .unwrap_or_default()
    }

    /// Give every scope flagged as adopting a tail the preceding statement's
    /// tail origin
    pub fn adopt_tail(&mut self, origin: &SymbolOrigin) {
        let adopting: Vec<ScopeId> = self
            .scopes
            .iter()
            .filter(|s| s.adopts_tail)
            .map(|s| s.id)
            .collect();
        for id in adopting {
            self.scopes.set_origin(id, origin.clone());
        }
    }
}

/// Operations shared by the two context kinds
pub(crate) trait RowsContext: Clone {
    fn is_empty(&self) -> bool;
    fn ptr_eq(a: &Self, b: &Self) -> bool;
    fn combine(a: &Self, b: &Self) -> Self;
}

impl RowsContext for RowsSourceContext {
    fn is_empty(&self) -> bool {
        RowsSourceContext::is_empty(self)
    }

    fn ptr_eq(a: &Self, b: &Self) -> bool {
        RowsSourceContext::ptr_eq(a, b)
    }

    fn combine(a: &Self, b: &Self) -> Self {
        RowsSourceContext::combine(a, b)
    }
}

impl RowsContext for RowsDataContext {
    fn is_empty(&self) -> bool {
        RowsDataContext::is_empty(self)
    }

    fn ptr_eq(a: &Self, b: &Self) -> bool {
        RowsDataContext::ptr_eq(a, b)
    }

    fn combine(a: &Self, b: &Self) -> Self {
        RowsDataContext::combine(a, b)
    }
}

/// Namespace seen by clauses that depend on both a target and its sources
///
/// A side that only passed the outer context through contributes nothing,
/// so the other side is returned as is.
pub(crate) fn combine_sides<C: RowsContext>(outer: &C, target: &C, sources: &C) -> C {
    if C::ptr_eq(target, outer) {
        sources.clone()
    } else if C::ptr_eq(sources, outer) {
        target.clone()
    } else {
        C::combine(target, sources)
    }
}

/// Outer context plus a DML target resolved on its own
pub(crate) fn extend_outer<C: RowsContext>(outer: &C, own: &C) -> C {
    if outer.is_empty() {
        own.clone()
    } else {
        C::combine(outer, own)
    }
}

/// Expression-clause origin for `data`; `Empty` when nothing is visible
pub(crate) fn syntax_origin(data: &RowsDataContext) -> SymbolOrigin {
    if data.is_empty() {
        SymbolOrigin::Empty
    } else {
        SymbolOrigin::SyntaxBasedFromRowsData(data.clone())
    }
}

/// Column-list origin for `data`; `Empty` when nothing is visible
pub(crate) fn data_ref_origin(data: &RowsDataContext) -> SymbolOrigin {
    if data.is_empty() {
        SymbolOrigin::Empty
    } else {
        SymbolOrigin::RowsDataRef(data.clone())
    }
}

pub(crate) fn set_origin(scopes: &mut ScopeTree, id: Option<ScopeId>, origin: SymbolOrigin) {
    if let Some(id) = id {
        scopes.set_origin(id, origin);
    }
}

/// Target table of an INSERT, UPDATE or DELETE
pub(crate) fn recognize_target<N: SyntaxNode>(
    node: &N,
    statement: &str,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> Option<RowsSourceModel> {
    let rules = *ctx.rules();
    let Some(target) = node.children().into_iter().find(|c| rules.is_rows_source(c.kind())) else {
        ctx.report(
            DiagnosticKind::StructuralGap,
            node.interval(),
            format!("{statement} without a target table"),
        );
        return None;
    };
    Some(recognize_rows_source(&target, scopes, scope, closing, ctx)).filter(|t| !t.is_unrecognized())
}

/// Report a clause the active dialect does not accept
pub(crate) fn check_extension<N: SyntaxNode>(
    clause: &N,
    ext: ClauseExtension,
    ctx: &mut RecognitionContext,
) {
    if ctx.supports(ext) {
        return;
    }
    let message = format!(
        "{} is not supported by {}",
        leading_keywords(clause),
        ctx.capabilities().dialect.name()
    );
    ctx.report(DiagnosticKind::UnsupportedClause, clause.interval(), message);
}

/// The expression of a single-expression clause (`WHERE e`, `HAVING e`)
pub(crate) fn clause_expression<N: SyntaxNode>(
    clause: &N,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> Option<ValueExpression> {
    clause
        .children()
        .into_iter()
        .find(|c| !c.is_token())
        .map(|node| recognize_expression(&node, scopes, scope, ctx))
        .filter(|e| !e.is_unrecognized())
}

/// Expressions of a list clause
///
/// Children of kind `item_rule` (`order_by_item`) contribute their first
/// named child.
pub(crate) fn clause_expressions<N: SyntaxNode>(
    clause: &N,
    item_rule: Option<&str>,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> Vec<ValueExpression> {
    let mut expressions = Vec::new();
    for child in clause.children() {
        if child.is_token() {
            continue;
        }
        let node = match item_rule {
            Some(rule) if child.kind() == rule => match child.children().into_iter().find(|c| !c.is_token()) {
                Some(inner) => inner,
                None => continue,
            },
            _ => child,
        };
        let expr = recognize_expression(&node, scopes, scope, ctx);
        if !expr.is_unrecognized() {
            expressions.push(expr);
        }
    }
    expressions
}
