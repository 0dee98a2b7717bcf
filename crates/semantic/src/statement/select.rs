// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # SELECT
//!
//! Clause scopes: projection (after `SELECT [DISTINCT]`), sources (after
//! `FROM`), conditions, grouping, having, ordering and limit. The FROM list
//! is resolved first; every expression clause sees its sources. Set
//! operations chain a second SELECT resolved against the outer context.

use super::{clause_expression, clause_expressions, set_origin, syntax_origin};
use crate::context::RecognitionContext;
use crate::diagnostics::DiagnosticKind;
use crate::expression::{ExpressionKind, ValueExpression, alias_of, recognize_expression};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source::{RowsSourceModel, recognize_rows_source};
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{ClauseSegment, ScopeId, ScopeRole, ScopeTree, SymbolOrigin, open_clause_scopes};
use crate::symbol::ColumnSymbol;
use sqlscope_ir::{DataType, Identifier, ScopeEnd, TextInterval};
use sqlscope_syntax::{SyntaxNode, introducing_keyword_end, leading_keywords};
use tracing::trace;

/// Name given to output columns that have none
const ANONYMOUS_COLUMN: &str = "?column?";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: ValueExpression,
    pub alias: Option<Identifier>,
}

/// `UNION [ALL]`, `INTERSECT`, `EXCEPT` and the query on their right
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub operator: String,
    pub right: Box<SelectModel>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectScopes {
    pub projection: Option<ScopeId>,
    pub sources: Option<ScopeId>,
    pub conditions: Option<ScopeId>,
    pub grouping: Option<ScopeId>,
    pub having: Option<ScopeId>,
    pub ordering: Option<ScopeId>,
    pub limit: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectModel {
    pub interval: TextInterval,
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Vec<RowsSourceModel>,
    pub filter: Option<ValueExpression>,
    pub group_by: Vec<ValueExpression>,
    pub having: Option<ValueExpression>,
    pub order_by: Vec<ValueExpression>,
    pub limit: Vec<ValueExpression>,
    pub set_operation: Option<SetOperation>,
    pub scopes: SelectScopes,
    /// Result columns, known after the data pass unless a wildcard covers
    /// a table with unknown columns
    pub output: Option<Vec<ColumnSymbol>>,
}

impl SelectModel {
    fn empty(interval: TextInterval) -> Self {
        Self {
            interval,
            distinct: false,
            items: Vec::new(),
            from: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: Vec::new(),
            set_operation: None,
            scopes: SelectScopes::default(),
            output: None,
        }
    }

    pub fn output_columns(&self) -> Option<&[ColumnSymbol]> {
        self.output.as_deref()
    }

    /// Type of a single-column result (scalar subqueries)
    pub fn single_output_type(&self) -> Option<DataType> {
        match self.output.as_deref() {
            Some([column]) => column.data_type.clone(),
            _ => None,
        }
    }

    /// Structural pass
    ///
    /// Returns the outer context extended with the FROM sources.
    pub fn resolve_object_and_rows_references(
        &mut self,
        outer: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) -> RowsSourceContext {
        let mut local = outer.clone();
        for source in &mut self.from {
            local = source.resolve_row_sources(&local, ctx);
        }
        for item in &mut self.items {
            item.expr.resolve_row_sources(&local, ctx);
        }
        let clauses = self
            .filter
            .iter_mut()
            .chain(self.group_by.iter_mut())
            .chain(self.having.iter_mut())
            .chain(self.order_by.iter_mut())
            .chain(self.limit.iter_mut());
        for expr in clauses {
            expr.resolve_row_sources(&local, ctx);
        }
        if let Some(op) = &mut self.set_operation {
            op.right.resolve_object_and_rows_references(outer, ctx);
        }
        local
    }

    /// Data pass
    pub fn resolve_value_relations(
        &mut self,
        outer: &RowsDataContext,
        scopes: &mut ScopeTree,
        ctx: &mut RecognitionContext,
    ) -> RowsDataContext {
        let mut local = outer.clone();
        for source in &mut self.from {
            local = source.resolve_value_relations(&local, scopes, ctx);
        }
        for item in &mut self.items {
            item.expr.resolve_value_relations(&local, scopes, ctx);
        }
        let clauses = self
            .filter
            .iter_mut()
            .chain(self.group_by.iter_mut())
            .chain(self.having.iter_mut());
        for expr in clauses {
            expr.resolve_value_relations(&local, scopes, ctx);
        }

        // ORDER BY may name an output column
        for expr in &mut self.order_by {
            let aliased = expr
                .as_column()
                .filter(|c| c.qualifier().is_empty())
                .and_then(|c| c.column())
                .and_then(|name| self.items.iter().find(|i| i.alias.as_ref() == Some(name)))
                .map(|item| item.expr.data_type.clone());
            match aliased {
                Some(data_type) => expr.data_type = data_type,
                None => expr.resolve_value_relations(&local, scopes, ctx),
            }
        }
        for expr in &mut self.limit {
            expr.resolve_value_relations(&local, scopes, ctx);
        }

        if let Some(op) = &mut self.set_operation {
            op.right.resolve_value_relations(outer, scopes, ctx);
        }
        self.output = self.compute_output(&local);

        let origin = syntax_origin(&local);
        for id in [
            self.scopes.projection,
            self.scopes.conditions,
            self.scopes.grouping,
            self.scopes.having,
            self.scopes.ordering,
        ] {
            set_origin(scopes, id, origin.clone());
        }
        set_origin(scopes, self.scopes.sources, syntax_origin(outer));
        set_origin(scopes, self.scopes.limit, SymbolOrigin::Empty);
        trace!(tables = local.tables().len(), "Resolved SELECT");
        local
    }

    fn compute_output(&self, local: &RowsDataContext) -> Option<Vec<ColumnSymbol>> {
        let mut columns = Vec::new();
        for item in &self.items {
            match &item.expr.kind {
                ExpressionKind::Star { qualifier } if qualifier.is_empty() => {
                    let tables = local.tables().iter().filter(|t| t.level == local.level());
                    for table in tables {
                        if !table.columns_known {
                            return None;
                        }
                        columns.extend(table.columns.iter().cloned());
                    }
                }
                ExpressionKind::Star { qualifier } => {
                    let table = local.find_table(qualifier).filter(|t| t.columns_known)?;
                    columns.extend(table.columns.iter().cloned());
                }
                kind => {
                    let name = item
                        .alias
                        .clone()
                        .or_else(|| match kind {
                            ExpressionKind::Column(column) => column.column().cloned(),
                            ExpressionKind::FunctionCall { name, .. } => name.clone(),
                            _ => None,
                        })
                        .unwrap_or_else(|| Identifier::new(ANONYMOUS_COLUMN));
                    let mut column = ColumnSymbol::untyped(name, None);
                    column.data_type = item.expr.data_type.clone();
                    columns.push(column);
                }
            }
        }
        Some(columns)
    }
}

/// Recognize a SELECT statement
///
/// Scopes are added under `parent`; the last one ends at `closing`, which is
/// unbounded for a top-level statement and the enclosing node's end for a
/// subquery.
pub fn recognize_select<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> SelectModel {
    let rules = *ctx.rules();
    let mut model = SelectModel::empty(node.interval());
    model.distinct = node.find_token("DISTINCT").is_some();

    let set_operation = node.find_first_child_of_name(rules.set_operation);
    let left_closing = set_operation
        .as_ref()
        .map_or(closing, |op| ScopeEnd::Bounded(op.start()));

    let mut segments = vec![ClauseSegment::new(
        ScopeRole::Projection,
        node.start(),
        introducing_keyword_end(node),
    )];
    for child in node.children() {
        let role = match child.kind() {
            k if k == rules.from_clause => ScopeRole::Sources,
            k if k == rules.where_clause => ScopeRole::Conditions,
            k if k == rules.group_by_clause => ScopeRole::Grouping,
            k if k == rules.having_clause => ScopeRole::Having,
            k if k == rules.order_by_clause => ScopeRole::Ordering,
            k if k == rules.limit_clause => ScopeRole::Limit,
            _ => continue,
        };
        segments.push(ClauseSegment::new(role, child.start(), introducing_keyword_end(&child)));
    }
    let opened = open_clause_scopes(scopes, segments, parent, left_closing);
    model.scopes = SelectScopes {
        projection: opened.get(ScopeRole::Projection),
        sources: opened.get(ScopeRole::Sources),
        conditions: opened.get(ScopeRole::Conditions),
        grouping: opened.get(ScopeRole::Grouping),
        having: opened.get(ScopeRole::Having),
        ordering: opened.get(ScopeRole::Ordering),
        limit: opened.get(ScopeRole::Limit),
    };

    for child in node.children() {
        if child.is_token() {
            continue;
        }
        if ctx.check_cancelled(child.start()) {
            break;
        }
        let kind = child.kind();
        if kind == rules.select_list {
            model.items = recognize_select_items(&child, scopes, model.scopes.projection, ctx);
        } else if kind == rules.from_clause {
            let sources_end = model
                .scopes
                .sources
                .and_then(|id| scopes.get(id))
                .map_or(left_closing, |s| s.interval.end);
            model.from = recognize_from_items(&child, scopes, model.scopes.sources, sources_end, ctx);
        } else if kind == rules.where_clause {
            model.filter = clause_expression(&child, scopes, model.scopes.conditions, ctx);
        } else if kind == rules.group_by_clause {
            model.group_by = clause_expressions(&child, None, scopes, model.scopes.grouping, ctx);
        } else if kind == rules.having_clause {
            model.having = clause_expression(&child, scopes, model.scopes.having, ctx);
        } else if kind == rules.order_by_clause {
            model.order_by = clause_expressions(
                &child,
                Some(rules.order_by_item),
                scopes,
                model.scopes.ordering,
                ctx,
            );
        } else if kind == rules.limit_clause {
            model.limit = clause_expressions(&child, None, scopes, model.scopes.limit, ctx);
        } else if kind == rules.set_operation {
            model.set_operation = recognize_set_operation(&child, scopes, parent, closing, ctx);
        } else if child.is_error() || kind == rules.unexpected {
            ctx.report(
                DiagnosticKind::MalformedSubtree,
                child.interval(),
                format!("Unexpected input in SELECT: {}", child.text_content().trim()),
            );
        }
    }
    model
}

fn recognize_select_items<N: SyntaxNode>(
    list: &N,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> Vec<SelectItem> {
    let rules = *ctx.rules();
    let mut items = Vec::new();
    for child in list.children() {
        if child.is_token() {
            continue;
        }
        let (node, alias) = if child.kind() == rules.select_item {
            let inner = child
                .children()
                .into_iter()
                .find(|c| !c.is_token() && c.kind() != rules.alias);
            match inner {
                Some(inner) => (inner, alias_of(&child, ctx)),
                None => continue,
            }
        } else {
            (child, None)
        };
        let expr = recognize_expression(&node, scopes, scope, ctx);
        if !expr.is_unrecognized() {
            items.push(SelectItem { expr, alias });
        }
    }
    items
}

/// Rows sources of a FROM (or UPDATE ... FROM, DELETE ... USING) list
///
/// The last source may carry a join condition reaching to `closing`.
pub(crate) fn recognize_from_items<N: SyntaxNode>(
    clause: &N,
    scopes: &mut ScopeTree,
    scope: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> Vec<RowsSourceModel> {
    let items: Vec<N> = clause.children().into_iter().filter(|c| !c.is_token()).collect();
    let count = items.len();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_closing = if i + 1 == count {
                closing
            } else {
                ScopeEnd::Bounded(item.end())
            };
            recognize_rows_source(item, scopes, scope, item_closing, ctx)
        })
        .filter(|source| !source.is_unrecognized())
        .collect()
}

fn recognize_set_operation<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> Option<SetOperation> {
    let rules = *ctx.rules();
    let operator = leading_keywords(node);
    let Some(right) = node.find_first_child_of_name(rules.select_statement) else {
        ctx.report(
            DiagnosticKind::StructuralGap,
            node.interval(),
            format!("{operator} without a query"),
        );
        return None;
    };
    let right = recognize_select(&right, scopes, parent, closing, ctx);
    Some(SetOperation {
        operator,
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows_source::RowsSourceKind;
    use sqlscope_ir::{DialectCapabilities, QualifiedName, UNBOUNDED};
    use sqlscope_syntax::MockSyntaxNode;

    fn ident(text: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::leaf("identifier", text, start)
    }

    fn column(text: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::new("column_reference")
            .with_child(ident(text, start))
            .fit_to_children()
    }

    fn table(name: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::new("table_reference")
            .with_child(
                MockSyntaxNode::new("object_name")
                    .with_child(ident(name, start))
                    .fit_to_children(),
            )
            .fit_to_children()
    }

    // SELECT id FROM users WHERE id = 1
    fn select() -> MockSyntaxNode {
        MockSyntaxNode::new("select_statement")
            .with_child(MockSyntaxNode::keyword("SELECT", 0))
            .with_child(
                MockSyntaxNode::new("select_list")
                    .with_child(
                        MockSyntaxNode::new("select_item")
                            .with_child(column("id", 7))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("from_clause")
                    .with_child(MockSyntaxNode::keyword("FROM", 10))
                    .with_child(table("users", 15))
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("where_clause")
                    .with_child(MockSyntaxNode::keyword("WHERE", 21))
                    .with_child(
                        MockSyntaxNode::new("binary_expression")
                            .with_child(column("id", 27))
                            .with_child(MockSyntaxNode::punct("=", 30))
                            .with_child(MockSyntaxNode::leaf("literal", "1", 32))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .fit_to_children()
    }

    #[test]
    fn test_select_scopes() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let model = recognize_select(&&select(), &mut scopes, None, UNBOUNDED, &mut ctx);

        assert_eq!(model.items.len(), 1);
        assert!(matches!(
            &model.from[0].kind,
            RowsSourceKind::Table { name, .. } if *name == QualifiedName::simple(Identifier::new("users"))
        ));
        assert!(model.filter.is_some());
        assert_eq!(scopes.len(), 3);
        assert_eq!(scopes.scope_at(8).map(|s| s.role), Some(ScopeRole::Projection));
        assert_eq!(scopes.scope_at(17).map(|s| s.role), Some(ScopeRole::Sources));
        assert_eq!(scopes.scope_at(2), None);
        assert_eq!(scopes.scope_at(999).map(|s| s.role), Some(ScopeRole::Conditions));
        assert!(scopes.siblings_disjoint());
    }

    #[test]
    fn test_select_origins_and_output() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_select(&&select(), &mut scopes, None, UNBOUNDED, &mut ctx);

        let sources = model.resolve_object_and_rows_references(&RowsSourceContext::empty(), &mut ctx);
        assert_eq!(sources.len(), 1);
        let data = model.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert_eq!(data.tables().len(), 1);

        // no metadata: the single table is name-only, `id` binds untyped
        assert!(ctx.diagnostics().is_empty());
        let output = model.output_columns().unwrap();
        assert_eq!(output[0].name, Identifier::new("id"));
        assert!(matches!(
            scopes.scope_at(28).map(|s| &s.origin),
            Some(SymbolOrigin::SyntaxBasedFromRowsData(_))
        ));
        assert_eq!(scopes.scope_at(17).map(|s| s.origin.clone()), Some(SymbolOrigin::Empty));
    }

    #[test]
    fn test_star_over_unknown_table_has_no_output() {
        // SELECT * FROM t
        let node = MockSyntaxNode::new("select_statement")
            .with_child(MockSyntaxNode::keyword("SELECT", 0))
            .with_child(
                MockSyntaxNode::new("select_list")
                    .with_child(MockSyntaxNode::new("star").with_child(MockSyntaxNode::punct("*", 7)).fit_to_children())
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("from_clause")
                    .with_child(MockSyntaxNode::keyword("FROM", 9))
                    .with_child(table("t", 14))
                    .fit_to_children(),
            )
            .fit_to_children();
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let mut model = recognize_select(&&node, &mut scopes, None, UNBOUNDED, &mut ctx);
        model.resolve_object_and_rows_references(&RowsSourceContext::empty(), &mut ctx);
        model.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert_eq!(model.output_columns(), None);
        assert_eq!(model.single_output_type(), None);
    }

    #[test]
    fn test_set_operation_splits_scopes() {
        // SELECT a UNION SELECT b
        let right = MockSyntaxNode::new("select_statement")
            .with_child(MockSyntaxNode::keyword("SELECT", 15))
            .with_child(MockSyntaxNode::new("select_list").with_child(column("b", 22)).fit_to_children())
            .fit_to_children();
        let node = MockSyntaxNode::new("select_statement")
            .with_child(MockSyntaxNode::keyword("SELECT", 0))
            .with_child(MockSyntaxNode::new("select_list").with_child(column("a", 7)).fit_to_children())
            .with_child(
                MockSyntaxNode::new("set_operation")
                    .with_child(MockSyntaxNode::keyword("UNION", 9))
                    .with_child(right)
                    .fit_to_children(),
            )
            .fit_to_children();
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let model = recognize_select(&&node, &mut scopes, None, UNBOUNDED, &mut ctx);

        let op = model.set_operation.as_ref().unwrap();
        assert_eq!(op.operator, "UNION");
        assert_eq!(op.right.items.len(), 1);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes.scope_at(8).map(|s| s.id), model.scopes.projection);
        assert_eq!(scopes.scope_at(12), None);
        assert_eq!(scopes.scope_at(40).map(|s| s.id), op.right.scopes.projection);
        assert!(scopes.siblings_disjoint());
    }
}
