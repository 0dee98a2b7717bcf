// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # INSERT
//!
//! `INSERT INTO t [(columns)] VALUES (...), ...` or `INSERT INTO t [(columns)]
//! SELECT ...`. The column list sees only the target; VALUES rows and the
//! source query see the outer context.

use super::{data_ref_origin, extend_outer, recognize_target, set_origin, syntax_origin};
use crate::context::RecognitionContext;
use crate::diagnostics::DiagnosticKind;
use crate::expression::{ValueExpression, recognize_expression, recognize_operands};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source::RowsSourceModel;
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{ClauseSegment, ScopeId, ScopeRole, ScopeTree, SymbolOrigin, open_clause_scopes};
use crate::statement::select::{SelectModel, recognize_select};
use sqlscope_ir::{ScopeEnd, TextInterval};
use sqlscope_syntax::{SyntaxNode, introducing_keyword_end, token_end};

/// Rows to insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<ValueExpression>>),
    Query(Box<SelectModel>),
    Missing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertScopes {
    pub table_references: Option<ScopeId>,
    pub columns: Option<ScopeId>,
    pub values: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertModel {
    pub interval: TextInterval,
    pub target: Option<RowsSourceModel>,
    pub columns: Vec<ValueExpression>,
    pub source: InsertSource,
    pub scopes: InsertScopes,
}

impl InsertModel {
    /// Returns the outer context extended with the target
    pub fn resolve_object_and_rows_references(
        &mut self,
        outer: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) -> RowsSourceContext {
        let (own, target) = match &mut self.target {
            Some(table) => {
                let own = table.resolve_row_sources(&RowsSourceContext::empty(), ctx);
                let target = extend_outer(outer, &own);
                (own, target)
            }
            None => (RowsSourceContext::empty(), outer.clone()),
        };
        for column in &mut self.columns {
            column.resolve_row_sources(&own, ctx);
        }
        match &mut self.source {
            InsertSource::Values(rows) => {
                for expr in rows.iter_mut().flatten() {
                    expr.resolve_row_sources(outer, ctx);
                }
            }
            InsertSource::Query(query) => {
                query.resolve_object_and_rows_references(outer, ctx);
            }
            InsertSource::Missing => {}
        }
        target
    }

    pub fn resolve_value_relations(
        &mut self,
        outer: &RowsDataContext,
        scopes: &mut ScopeTree,
        ctx: &mut RecognitionContext,
    ) -> RowsDataContext {
        let (own, target) = match &mut self.target {
            Some(table) => {
                let own = table.resolve_value_relations(&RowsDataContext::empty(), scopes, ctx);
                let target = extend_outer(outer, &own);
                (own, target)
            }
            None => (RowsDataContext::empty(), outer.clone()),
        };
        for column in &mut self.columns {
            column.resolve_value_relations(&own, scopes, ctx);
        }
        match &mut self.source {
            InsertSource::Values(rows) => {
                for expr in rows.iter_mut().flatten() {
                    expr.resolve_value_relations(outer, scopes, ctx);
                }
            }
            InsertSource::Query(query) => {
                query.resolve_value_relations(outer, scopes, ctx);
            }
            InsertSource::Missing => {}
        }
        self.check_arity(ctx);

        set_origin(scopes, self.scopes.table_references, SymbolOrigin::Empty);
        set_origin(scopes, self.scopes.columns, data_ref_origin(&own));
        set_origin(scopes, self.scopes.values, syntax_origin(outer));
        target
    }

    /// Report VALUES rows whose width differs from the column list
    fn check_arity(&self, ctx: &mut RecognitionContext) {
        let InsertSource::Values(rows) = &self.source else {
            return;
        };
        if self.columns.is_empty() {
            return;
        }
        for row in rows.iter().filter(|r| !r.is_empty() && r.len() != self.columns.len()) {
            let interval = row
                .iter()
                .map(|e| e.interval)
                .reduce(|a, b| a.cover(&b))
                .unwrap_or(self.interval);
            ctx.report(
                DiagnosticKind::StructuralGap,
                interval,
                format!("Expected {} values, got {}", self.columns.len(), row.len()),
            );
        }
    }
}

/// Recognize an INSERT statement
pub fn recognize_insert<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> InsertModel {
    let rules = *ctx.rules();
    let column_list = node.find_first_child_of_name(rules.column_list);
    let values_clause = node.find_first_child_of_name(rules.values_clause);
    let query = node.find_first_child_of_name(rules.select_statement);

    let mut segments = vec![ClauseSegment::new(
        ScopeRole::TableReferences,
        node.start(),
        introducing_keyword_end(node),
    )];
    if let Some(list) = &column_list {
        segments.push(ClauseSegment::new(ScopeRole::InsertColumns, list.start(), token_end(list, "(")));
    }
    if let Some(values) = &values_clause {
        segments.push(ClauseSegment::new(
            ScopeRole::InsertValues,
            values.start(),
            introducing_keyword_end(values),
        ));
    }
    // a source query opens its own scopes
    let layout_end = query.as_ref().map_or(closing, |q| ScopeEnd::Bounded(q.start()));
    let opened = open_clause_scopes(scopes, segments, None, layout_end);
    let insert_scopes = InsertScopes {
        table_references: opened.get(ScopeRole::TableReferences),
        columns: opened.get(ScopeRole::InsertColumns),
        values: opened.get(ScopeRole::InsertValues),
    };
    let target_end = insert_scopes
        .table_references
        .and_then(|id| scopes.get(id))
        .map_or(layout_end, |s| s.interval.end);

    let mut model = InsertModel {
        interval: node.interval(),
        target: None,
        columns: Vec::new(),
        source: InsertSource::Missing,
        scopes: insert_scopes,
    };
    model.target = recognize_target(node, "INSERT", scopes, insert_scopes.table_references, target_end, ctx);

    if let Some(list) = &column_list {
        if ctx.check_cancelled(list.start()) {
            return model;
        }
        model.columns = list
            .children()
            .into_iter()
            .filter(|c| !c.is_token())
            .map(|c| recognize_expression(&c, scopes, insert_scopes.columns, ctx))
            .filter(|e| e.as_column().is_some())
            .collect();
    }

    let source = match (&values_clause, &query) {
        (Some(values), _) => {
            if ctx.check_cancelled(values.start()) {
                return model;
            }
            InsertSource::Values(recognize_rows(values, scopes, insert_scopes.values, ctx))
        }
        (None, Some(query)) => {
            if ctx.check_cancelled(query.start()) {
                return model;
            }
            InsertSource::Query(Box::new(recognize_select(query, scopes, None, closing, ctx)))
        }
        (None, None) => {
            ctx.report(DiagnosticKind::StructuralGap, node.interval(), "INSERT without VALUES or SELECT");
            InsertSource::Missing
        }
    };
    model.source = source;
    model
}

fn recognize_rows<N: SyntaxNode>(
    values: &N,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> Vec<Vec<ValueExpression>> {
    let rules = *ctx.rules();
    let mut rows = Vec::new();
    for child in values.children() {
        if child.is_token() {
            continue;
        }
        if child.kind() == rules.row_value || child.kind() == rules.expression_list {
            rows.push(recognize_operands(child.children(), scopes, scope, ctx));
        } else {
            let expr = recognize_expression(&child, scopes, scope, ctx);
            if !expr.is_unrecognized() {
                rows.push(vec![expr]);
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_ir::{DialectCapabilities, UNBOUNDED, compute_scope_interval};
    use sqlscope_syntax::MockSyntaxNode;

    fn ident(text: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::leaf("identifier", text, start)
    }

    // INSERT INTO t (a, b) VALUES (1, 2)
    fn insert() -> MockSyntaxNode {
        MockSyntaxNode::new("insert_statement")
            .with_child(MockSyntaxNode::keyword("INSERT", 0))
            .with_child(MockSyntaxNode::keyword("INTO", 7))
            .with_child(
                MockSyntaxNode::new("table_reference")
                    .with_child(MockSyntaxNode::new("object_name").with_child(ident("t", 12)).fit_to_children())
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("column_list")
                    .with_child(MockSyntaxNode::punct("(", 14))
                    .with_child(ident("a", 15))
                    .with_child(MockSyntaxNode::punct(",", 16))
                    .with_child(ident("b", 18))
                    .with_child(MockSyntaxNode::punct(")", 19))
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("values_clause")
                    .with_child(MockSyntaxNode::keyword("VALUES", 21))
                    .with_child(
                        MockSyntaxNode::new("row_value")
                            .with_child(MockSyntaxNode::punct("(", 28))
                            .with_child(MockSyntaxNode::leaf("literal", "1", 29))
                            .with_child(MockSyntaxNode::punct(",", 30))
                            .with_child(MockSyntaxNode::leaf("literal", "2", 32))
                            .with_child(MockSyntaxNode::punct(")", 33))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .fit_to_children()
    }

    #[test]
    fn test_insert_scopes() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let model = recognize_insert(&&insert(), &mut scopes, UNBOUNDED, &mut ctx);

        assert_eq!(model.columns.len(), 2);
        assert!(matches!(&model.source, InsertSource::Values(rows) if rows.len() == 1 && rows[0].len() == 2));
        let interval_of = |id: Option<ScopeId>| id.and_then(|id| scopes.get(id)).map(|s| s.interval);
        assert_eq!(
            interval_of(model.scopes.columns),
            Some(compute_scope_interval(15, ScopeEnd::Bounded(21)))
        );
        assert_eq!(
            interval_of(model.scopes.values),
            Some(compute_scope_interval(27, UNBOUNDED))
        );
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_insert_columns_see_target_only() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_insert(&&insert(), &mut scopes, UNBOUNDED, &mut ctx);
        let outer = RowsSourceContext::empty();
        let target = model.resolve_object_and_rows_references(&outer, &mut ctx);
        assert_eq!(target.len(), 1);

        model.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert!(matches!(scopes.scope_at(16).map(|s| &s.origin), Some(SymbolOrigin::RowsDataRef(_))));
        assert_eq!(scopes.scope_at(30).map(|s| s.origin.clone()), Some(SymbolOrigin::Empty));
        assert!(model.columns.iter().all(|c| c.as_column().is_some_and(|c| c.is_resolved())));
    }

    #[test]
    fn test_values_arity_mismatch() {
        // INSERT INTO t (a) VALUES (1, 2)
        let node = MockSyntaxNode::new("insert_statement")
            .with_child(MockSyntaxNode::keyword("INSERT", 0))
            .with_child(MockSyntaxNode::keyword("INTO", 7))
            .with_child(
                MockSyntaxNode::new("table_reference")
                    .with_child(MockSyntaxNode::new("object_name").with_child(ident("t", 12)).fit_to_children())
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("column_list")
                    .with_child(MockSyntaxNode::punct("(", 14))
                    .with_child(ident("a", 15))
                    .with_child(MockSyntaxNode::punct(")", 16))
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("values_clause")
                    .with_child(MockSyntaxNode::keyword("VALUES", 18))
                    .with_child(
                        MockSyntaxNode::new("row_value")
                            .with_child(MockSyntaxNode::punct("(", 25))
                            .with_child(MockSyntaxNode::leaf("literal", "1", 26))
                            .with_child(MockSyntaxNode::punct(",", 27))
                            .with_child(MockSyntaxNode::leaf("literal", "2", 29))
                            .with_child(MockSyntaxNode::punct(")", 30))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .fit_to_children();
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_insert(&&node, &mut scopes, UNBOUNDED, &mut ctx);
        model.resolve_object_and_rows_references(&RowsSourceContext::empty(), &mut ctx);
        model.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].message, "Expected 1 values, got 2");
        assert_eq!(ctx.diagnostics()[0].interval, TextInterval::new(26, 30));
    }
}
