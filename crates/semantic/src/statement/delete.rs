// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # DELETE
//!
//! `DELETE FROM t [USING s] [WHERE ...] [ORDER BY ...] [LIMIT n]`. Resolves
//! like UPDATE: WHERE, ORDER BY and LIMIT see the target combined with the
//! `USING` sources.

use super::{
    clause_expression, clause_expressions, check_extension, combine_sides, extend_outer,
    recognize_target, set_origin, syntax_origin,
};
use crate::context::RecognitionContext;
use crate::expression::ValueExpression;
use crate::rows_data_context::RowsDataContext;
use crate::rows_source::RowsSourceModel;
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{ClauseSegment, ScopeId, ScopeRole, ScopeTree, SymbolOrigin, open_clause_scopes};
use crate::statement::select::recognize_from_items;
use sqlscope_ir::{ClauseExtension, ScopeEnd, TextInterval};
use sqlscope_syntax::{SyntaxNode, introducing_keyword_end};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteScopes {
    pub table_references: Option<ScopeId>,
    pub sources: Option<ScopeId>,
    pub conditions: Option<ScopeId>,
    pub limit: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteModel {
    pub interval: TextInterval,
    pub target: Option<RowsSourceModel>,
    pub using: Vec<RowsSourceModel>,
    pub filter: Option<ValueExpression>,
    pub order_by: Vec<ValueExpression>,
    pub limit: Vec<ValueExpression>,
    pub scopes: DeleteScopes,
}

impl DeleteModel {
    pub fn resolve_object_and_rows_references(
        &mut self,
        outer: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) -> RowsSourceContext {
        let target = match &mut self.target {
            Some(table) => {
                let own = table.resolve_row_sources(&RowsSourceContext::empty(), ctx);
                extend_outer(outer, &own)
            }
            None => outer.clone(),
        };
        let mut sources = outer.clone();
        for source in &mut self.using {
            sources = source.resolve_row_sources(&sources, ctx);
        }
        let combined = combine_sides(outer, &target, &sources);

        let expressions = self
            .filter
            .iter_mut()
            .chain(self.order_by.iter_mut())
            .chain(self.limit.iter_mut());
        for expr in expressions {
            expr.resolve_row_sources(&combined, ctx);
        }
        combined
    }

    pub fn resolve_value_relations(
        &mut self,
        outer: &RowsDataContext,
        scopes: &mut ScopeTree,
        ctx: &mut RecognitionContext,
    ) -> RowsDataContext {
        let target = match &mut self.target {
            Some(table) => {
                let own = table.resolve_value_relations(&RowsDataContext::empty(), scopes, ctx);
                extend_outer(outer, &own)
            }
            None => outer.clone(),
        };
        let mut sources = outer.clone();
        for source in &mut self.using {
            sources = source.resolve_value_relations(&sources, scopes, ctx);
        }
        let combined = combine_sides(outer, &target, &sources);

        let expressions = self
            .filter
            .iter_mut()
            .chain(self.order_by.iter_mut())
            .chain(self.limit.iter_mut());
        for expr in expressions {
            expr.resolve_value_relations(&combined, scopes, ctx);
        }

        set_origin(scopes, self.scopes.table_references, SymbolOrigin::Empty);
        set_origin(scopes, self.scopes.sources, syntax_origin(outer));
        set_origin(scopes, self.scopes.conditions, syntax_origin(&combined));
        set_origin(scopes, self.scopes.limit, SymbolOrigin::Empty);
        combined
    }
}

/// Recognize a DELETE statement
pub fn recognize_delete<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> DeleteModel {
    let rules = *ctx.rules();
    let using_clause = node.find_first_child_of_name(rules.using_clause);
    let where_clause = node.find_first_child_of_name(rules.where_clause);
    let order_by_clause = node.find_first_child_of_name(rules.order_by_clause);
    let limit_clause = node.find_first_child_of_name(rules.limit_clause);

    // `DELETE FROM` is one keyword run
    let mut segments = vec![ClauseSegment::new(
        ScopeRole::TableReferences,
        node.start(),
        introducing_keyword_end(node),
    )];
    if let Some(using) = &using_clause {
        segments.push(ClauseSegment::new(ScopeRole::Sources, using.start(), introducing_keyword_end(using)));
    }
    if let Some(conditions) = where_clause.as_ref().or(order_by_clause.as_ref()) {
        segments.push(ClauseSegment::new(
            ScopeRole::Conditions,
            conditions.start(),
            introducing_keyword_end(conditions),
        ));
    }
    if let Some(limit) = &limit_clause {
        segments.push(ClauseSegment::new(ScopeRole::Limit, limit.start(), introducing_keyword_end(limit)));
    }
    let opened = open_clause_scopes(scopes, segments, None, closing);
    let delete_scopes = DeleteScopes {
        table_references: opened.get(ScopeRole::TableReferences),
        sources: opened.get(ScopeRole::Sources),
        conditions: opened.get(ScopeRole::Conditions),
        limit: opened.get(ScopeRole::Limit),
    };
    let scope_end = |scopes: &ScopeTree, id: Option<ScopeId>| {
        id.and_then(|id| scopes.get(id)).map_or(closing, |s| s.interval.end)
    };

    let mut model = DeleteModel {
        interval: node.interval(),
        target: None,
        using: Vec::new(),
        filter: None,
        order_by: Vec::new(),
        limit: Vec::new(),
        scopes: delete_scopes,
    };
    let target_end = scope_end(scopes, delete_scopes.table_references);
    model.target = recognize_target(node, "DELETE", scopes, delete_scopes.table_references, target_end, ctx);

    if let Some(using) = &using_clause {
        if ctx.check_cancelled(using.start()) {
            return model;
        }
        check_extension(using, ClauseExtension::DeleteUsing, ctx);
        let sources_end = scope_end(scopes, delete_scopes.sources);
        model.using = recognize_from_items(using, scopes, delete_scopes.sources, sources_end, ctx);
    }
    if let Some(clause) = &where_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        model.filter = clause_expression(clause, scopes, delete_scopes.conditions, ctx);
    }
    if let Some(clause) = &order_by_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        check_extension(clause, ClauseExtension::DeleteOrderLimit, ctx);
        model.order_by = clause_expressions(
            clause,
            Some(rules.order_by_item),
            scopes,
            delete_scopes.conditions,
            ctx,
        );
    }
    if let Some(clause) = &limit_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        check_extension(clause, ClauseExtension::DeleteOrderLimit, ctx);
        model.limit = clause_expressions(clause, None, scopes, delete_scopes.limit, ctx);
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use sqlscope_ir::{Dialect, Identifier, UNBOUNDED, compute_scope_interval};
    use sqlscope_syntax::MockSyntaxNode;

    fn table(name: &str, alias: Option<&str>, start: usize) -> MockSyntaxNode {
        let mut node = MockSyntaxNode::new("table_reference").with_child(
            MockSyntaxNode::new("object_name")
                .with_child(MockSyntaxNode::leaf("identifier", name, start))
                .fit_to_children(),
        );
        if let Some(alias) = alias {
            node = node.with_child(
                MockSyntaxNode::new("alias")
                    .with_child(MockSyntaxNode::leaf("identifier", alias, start + name.len() + 1))
                    .fit_to_children(),
            );
        }
        node.fit_to_children()
    }

    fn qualified(qualifier: &str, name: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::new("column_reference")
            .with_child(MockSyntaxNode::leaf("identifier", qualifier, start))
            .with_child(MockSyntaxNode::punct(".", start + qualifier.len()))
            .with_child(MockSyntaxNode::leaf("identifier", name, start + qualifier.len() + 1))
            .fit_to_children()
    }

    // DELETE FROM t USING s WHERE t.id = s.id
    fn delete() -> MockSyntaxNode {
        MockSyntaxNode::new("delete_statement")
            .with_child(MockSyntaxNode::keyword("DELETE", 0))
            .with_child(MockSyntaxNode::keyword("FROM", 7))
            .with_child(table("t", None, 12))
            .with_child(
                MockSyntaxNode::new("using_clause")
                    .with_child(MockSyntaxNode::keyword("USING", 14))
                    .with_child(table("s", None, 20))
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("where_clause")
                    .with_child(MockSyntaxNode::keyword("WHERE", 22))
                    .with_child(
                        MockSyntaxNode::new("binary_expression")
                            .with_child(qualified("t", "id", 28))
                            .with_child(MockSyntaxNode::punct("=", 33))
                            .with_child(qualified("s", "id", 35))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .fit_to_children()
    }

    #[test]
    fn test_delete_using_combines_sources() {
        let mut ctx = RecognitionContext::new(Dialect::PostgreSQL.capabilities());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_delete(&&delete(), &mut scopes, UNBOUNDED, &mut ctx);

        let interval_of = |id: Option<ScopeId>| id.and_then(|id| scopes.get(id)).map(|s| s.interval);
        assert_eq!(
            interval_of(model.scopes.table_references),
            Some(compute_scope_interval(11, ScopeEnd::Bounded(14)))
        );
        assert_eq!(
            interval_of(model.scopes.sources),
            Some(compute_scope_interval(19, ScopeEnd::Bounded(22)))
        );

        let combined = model.resolve_object_and_rows_references(&RowsSourceContext::empty(), &mut ctx);
        assert_eq!(combined.len(), 2);
        assert!(combined.find(&[Identifier::new("s")]).is_some());
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_delete_using_unsupported_in_mysql() {
        let mut ctx = RecognitionContext::new(Dialect::MySQL.capabilities());
        let mut scopes = ScopeTree::new();
        let model = recognize_delete(&&delete(), &mut scopes, UNBOUNDED, &mut ctx);
        assert_eq!(model.using.len(), 1);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::UnsupportedClause);
    }

    #[test]
    fn test_delete_without_target() {
        let node = MockSyntaxNode::new("delete_statement")
            .with_child(MockSyntaxNode::keyword("DELETE", 0))
            .with_child(MockSyntaxNode::keyword("FROM", 7))
            .fit_to_children();
        let mut ctx = RecognitionContext::new(Dialect::PostgreSQL.capabilities());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_delete(&&node, &mut scopes, UNBOUNDED, &mut ctx);
        assert!(model.target.is_none());
        assert_eq!(ctx.statistics().structural_gaps, 1);

        let outer = RowsSourceContext::empty();
        let combined = model.resolve_object_and_rows_references(&outer, &mut ctx);
        assert!(RowsSourceContext::ptr_eq(&combined, &outer));
        assert!(scopes.scope_at(11).is_some_and(|s| s.interval.is_unbounded()));
    }
}
