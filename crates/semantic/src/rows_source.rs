// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Rows source model
//!
//! Table references, derived tables and joins. A source extends the context
//! it is resolved against: the structural pass adds its name, the data pass
//! adds its columns.

use crate::context::RecognitionContext;
use crate::diagnostics::DiagnosticKind;
use crate::error::SemanticError;
use crate::expression::{ValueExpression, alias_of, name_parts, nested_closing, recognize_expression};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source_context::{RowsSourceContext, SourceBinding};
use crate::scope::{ScopeId, ScopeRole, ScopeTree};
use crate::statement::select::{SelectModel, recognize_select};
use crate::statement::syntax_origin;
use crate::symbol::TableSymbol;
use sqlscope_catalog::TableLookup;
use sqlscope_ir::{Identifier, QualifiedName, ScopeEnd, TextInterval, compute_scope_interval};
use sqlscope_syntax::{SyntaxNode, introducing_keyword_end};
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct RowsSourceModel {
    pub interval: TextInterval,
    pub kind: RowsSourceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowsSourceKind {
    /// Catalog table or view
    Table {
        name: QualifiedName,
        alias: Option<Identifier>,
    },
    /// Subquery in FROM
    Derived {
        query: Box<SelectModel>,
        alias: Option<Identifier>,
    },
    Join {
        left: Box<RowsSourceModel>,
        right: Box<RowsSourceModel>,
        condition: Option<JoinCondition>,
    },
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub kind: JoinConditionKind,
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConditionKind {
    On(ValueExpression),
    Using(Vec<Identifier>),
}

impl RowsSourceModel {
    pub fn unrecognized(interval: TextInterval) -> Self {
        Self {
            interval,
            kind: RowsSourceKind::Unrecognized,
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self.kind, RowsSourceKind::Unrecognized)
    }

    /// Name this source can be referred to by
    pub fn visible_name(&self) -> Option<&Identifier> {
        match &self.kind {
            RowsSourceKind::Table { name, alias } => alias.as_ref().or(name.name()),
            RowsSourceKind::Derived { alias, .. } => alias.as_ref(),
            RowsSourceKind::Join { .. } | RowsSourceKind::Unrecognized => None,
        }
    }

    /// Structural pass: add this source's names to `context`
    pub fn resolve_row_sources(
        &mut self,
        context: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) -> RowsSourceContext {
        let interval = self.interval;
        match &mut self.kind {
            RowsSourceKind::Table { name, alias } => {
                ctx.note_table_reference(name, interval);
                context.with_source(SourceBinding::table(name.clone(), alias.clone(), interval))
            }
            RowsSourceKind::Derived { query, alias } => {
                query.resolve_object_and_rows_references(&context.nested(), ctx);
                context.with_source(SourceBinding::derived(alias.clone(), interval))
            }
            RowsSourceKind::Join {
                left,
                right,
                condition,
            } => {
                let left_ctx = left.resolve_row_sources(context, ctx);
                let joined = right.resolve_row_sources(&left_ctx, ctx);
                if let Some(JoinCondition {
                    kind: JoinConditionKind::On(expr),
                    ..
                }) = condition
                {
                    expr.resolve_row_sources(&joined, ctx);
                }
                joined
            }
            RowsSourceKind::Unrecognized => context.clone(),
        }
    }

    /// Data pass: add this source's columns to `data`
    pub fn resolve_value_relations(
        &mut self,
        data: &RowsDataContext,
        scopes: &mut ScopeTree,
        ctx: &mut RecognitionContext,
    ) -> RowsDataContext {
        let interval = self.interval;
        match &mut self.kind {
            RowsSourceKind::Table { name, alias } => {
                let mut symbol = TableSymbol::new(name.clone()).with_interval(interval);
                if let Some(alias) = alias {
                    symbol = symbol.with_alias(alias.clone());
                }
                let (symbol, missing) = match ctx.metadata().map(|m| m.lookup(name)) {
                    Some(TableLookup::Found(columns)) => (symbol.with_metadata(columns), false),
                    Some(TableLookup::Missing) => (symbol, true),
                    Some(TableLookup::NotFetched) | None => (symbol, false),
                };
                if missing {
                    ctx.report(
                        DiagnosticKind::UnresolvedSymbol,
                        interval,
                        SemanticError::TableNotFound(name.to_string()).to_string(),
                    );
                }
                trace!(table = %name, known = symbol.columns_known, "Resolved table columns");
                data.with_table(symbol)
            }
            RowsSourceKind::Derived { query, alias } => {
                query.resolve_value_relations(&data.nested(), scopes, ctx);
                let symbol = TableSymbol::derived(alias.clone()).with_interval(interval);
                let symbol = match query.output_columns() {
                    Some(columns) => symbol.with_columns(columns.to_vec()),
                    None => symbol,
                };
                data.with_table(symbol)
            }
            RowsSourceKind::Join {
                left,
                right,
                condition,
            } => {
                let left_data = left.resolve_value_relations(data, scopes, ctx);
                let joined = right.resolve_value_relations(&left_data, scopes, ctx);
                if let Some(condition) = condition {
                    if let Some(scope) = condition.scope {
                        scopes.set_origin(scope, syntax_origin(&joined));
                    }
                    if let JoinConditionKind::On(expr) = &mut condition.kind {
                        expr.resolve_value_relations(&joined, scopes, ctx);
                    }
                }
                joined
            }
            RowsSourceKind::Unrecognized => data.clone(),
        }
    }
}

/// Recognize a row source node
///
/// `closing` bounds a trailing join condition scope.
pub fn recognize_rows_source<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> RowsSourceModel {
    let rules = *ctx.rules();
    let interval = node.interval();
    let kind = node.kind();

    if node.is_error() || kind == rules.unexpected {
        ctx.report(
            DiagnosticKind::MalformedSubtree,
            interval,
            format!("Unexpected input in table list: {}", node.text_content().trim()),
        );
        return RowsSourceModel::unrecognized(interval);
    }

    if kind == rules.table_reference {
        let parts = match node.find_first_child_of_name(rules.object_name) {
            Some(object) => name_parts(&object, ctx),
            None => node
                .children()
                .iter()
                .filter(|c| c.kind() == rules.identifier)
                .map(|c| ctx.identifier(&c.text_content()))
                .collect(),
        };
        if parts.is_empty() {
            ctx.report(DiagnosticKind::StructuralGap, interval, "Table reference without a name");
            return RowsSourceModel::unrecognized(interval);
        }
        return RowsSourceModel {
            interval,
            kind: RowsSourceKind::Table {
                name: QualifiedName::new(parts),
                alias: alias_of(node, ctx),
            },
        };
    }

    if kind == rules.derived_table {
        let alias = alias_of(node, ctx);
        let select = node
            .find_first_child_of_name(rules.subquery)
            .and_then(|s| s.find_first_child_of_name(rules.select_statement).map(|q| (s, q)));
        let Some((subquery, select)) = select else {
            ctx.report(DiagnosticKind::MalformedSubtree, interval, "Derived table without SELECT");
            return RowsSourceModel::unrecognized(interval);
        };
        if !ctx.enter_nested(interval) {
            return RowsSourceModel::unrecognized(interval);
        }
        let query = recognize_select(&select, scopes, parent, nested_closing(&subquery, closing), ctx);
        ctx.exit_nested();
        return RowsSourceModel {
            interval,
            kind: RowsSourceKind::Derived {
                query: Box::new(query),
                alias,
            },
        };
    }

    if kind == rules.joined_table {
        return recognize_join(node, scopes, parent, closing, ctx);
    }

    // wrappers such as parenthesized table lists
    match node.find_first_non_error_child() {
        Some(inner) if rules.is_rows_source(inner.kind()) => {
            recognize_rows_source(&inner, scopes, parent, closing, ctx)
        }
        _ => {
            ctx.report(
                DiagnosticKind::MalformedSubtree,
                interval,
                format!("Unsupported table source: {kind}"),
            );
            RowsSourceModel::unrecognized(interval)
        }
    }
}

fn recognize_join<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> RowsSourceModel {
    let rules = *ctx.rules();
    let interval = node.interval();
    let condition_node = node.find_first_child_of_name(rules.join_condition);
    let sides: Vec<N> = node
        .children()
        .into_iter()
        .filter(|c| !c.is_token() && c.kind() != rules.join_condition)
        .collect();

    let (Some(left_node), right_node) = (sides.first(), sides.get(1)) else {
        ctx.report(DiagnosticKind::MalformedSubtree, interval, "Join without tables");
        return RowsSourceModel::unrecognized(interval);
    };

    let left = recognize_rows_source(left_node, scopes, parent, ScopeEnd::Bounded(left_node.end()), ctx);
    let right = match right_node {
        Some(right_node) => {
            let right_closing = if condition_node.is_some() {
                ScopeEnd::Bounded(right_node.end())
            } else {
                closing
            };
            recognize_rows_source(right_node, scopes, parent, right_closing, ctx)
        }
        None => {
            ctx.report(DiagnosticKind::StructuralGap, interval, "JOIN without a right-hand table");
            RowsSourceModel::unrecognized(TextInterval::new(interval.end, interval.end))
        }
    };

    let condition = condition_node.map(|cond| {
        let start = introducing_keyword_end(&cond).unwrap_or(cond.start());
        let scope = scopes.add(ScopeRole::JoinCondition, compute_scope_interval(start, closing), parent);
        let kind = if cond.find_token("USING").is_some() {
            let columns = cond
                .children()
                .iter()
                .filter(|c| c.kind() == rules.identifier || c.kind() == rules.column_reference)
                .flat_map(|c| name_parts(c, ctx))
                .collect();
            JoinConditionKind::Using(columns)
        } else {
            let expr = cond
                .children()
                .into_iter()
                .find(|c| !c.is_token())
                .map(|e| recognize_expression(&e, scopes, Some(scope), ctx))
                .filter(|e| !e.is_unrecognized());
            match expr {
                Some(expr) => JoinConditionKind::On(expr),
                None => {
                    ctx.report(DiagnosticKind::StructuralGap, cond.interval(), "ON without a condition");
                    JoinConditionKind::Using(Vec::new())
                }
            }
        };
        JoinCondition {
            kind,
            scope: Some(scope),
        }
    });

    RowsSourceModel {
        interval,
        kind: RowsSourceKind::Join {
            left: Box::new(left),
            right: Box::new(right),
            condition,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SymbolOrigin;
    use sqlscope_ir::{ColumnMetadata, DataType, DialectCapabilities};
    use sqlscope_syntax::MockSyntaxNode;

    fn table(name: &str, alias: Option<&str>, start: usize) -> MockSyntaxNode {
        let mut node = MockSyntaxNode::new("table_reference").with_child(
            MockSyntaxNode::new("object_name")
                .with_child(MockSyntaxNode::leaf("identifier", name, start))
                .fit_to_children(),
        );
        if let Some(alias) = alias {
            let at = start + name.len() + 1;
            node = node.with_child(
                MockSyntaxNode::new("alias")
                    .with_child(MockSyntaxNode::leaf("identifier", alias, at))
                    .fit_to_children(),
            );
        }
        node.fit_to_children()
    }

    #[test]
    fn test_table_with_alias() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let node = table("users", Some("u"), 0);
        let mut source =
            recognize_rows_source(&&node, &mut scopes, None, ScopeEnd::Unbounded, &mut ctx);
        assert_eq!(source.visible_name(), Some(&Identifier::new("u")));

        let context = source.resolve_row_sources(&RowsSourceContext::empty(), &mut ctx);
        assert!(context.find(&[Identifier::new("u")]).is_some());
        assert_eq!(ctx.table_references().len(), 1);
    }

    #[test]
    fn test_join_condition_scope() {
        // users u JOIN orders o ON u.id = o.user_id
        let on = MockSyntaxNode::new("join_condition")
            .with_child(MockSyntaxNode::keyword("ON", 26))
            .with_child(
                MockSyntaxNode::new("binary_expression")
                    .with_child(MockSyntaxNode::leaf("column_reference", "u.id", 29))
                    .with_child(MockSyntaxNode::punct("=", 34))
                    .with_child(MockSyntaxNode::leaf("column_reference", "o.user_id", 36))
                    .fit_to_children(),
            )
            .fit_to_children();
        let join = MockSyntaxNode::new("joined_table")
            .with_child(table("users", Some("u"), 0))
            .with_child(MockSyntaxNode::keyword("JOIN", 8))
            .with_child(table("orders", Some("o"), 13))
            .with_child(on)
            .fit_to_children();

        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let mut source =
            recognize_rows_source(&&join, &mut scopes, None, ScopeEnd::Bounded(60), &mut ctx);

        let scope = scopes.scope_at(40).unwrap();
        assert_eq!(scope.role, ScopeRole::JoinCondition);
        assert_eq!(scope.interval, compute_scope_interval(28, ScopeEnd::Bounded(60)));

        let context = source.resolve_row_sources(&RowsSourceContext::empty(), &mut ctx);
        assert_eq!(context.len(), 2);
        assert!(ctx.diagnostics().is_empty());

        let mut cache = sqlscope_catalog::MetadataCache::new();
        cache.insert_table(
            &QualifiedName::simple(Identifier::new("users")),
            vec![ColumnMetadata::new("id", DataType::Integer)],
        );
        cache.mark_missing(&QualifiedName::simple(Identifier::new("orders")));
        let catalog = std::sync::Arc::new(sqlscope_catalog::StaticCatalog::default());
        let mut ctx = ctx.with_execution(crate::ExecutionContext::new(catalog).with_cache(cache));

        let data = source.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert_eq!(data.tables().len(), 2);
        assert!(data.is_name_only());
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].message, "Table not found: orders");
        assert!(matches!(
            scopes.scope_at(40).map(|s| &s.origin),
            Some(SymbolOrigin::SyntaxBasedFromRowsData(joined)) if joined.tables().len() == 2
        ));
    }

    #[test]
    fn test_error_node_is_unrecognized() {
        let mut ctx = RecognitionContext::new(DialectCapabilities::default());
        let mut scopes = ScopeTree::new();
        let error = MockSyntaxNode::error().with_range(5, 9);
        let mut source =
            recognize_rows_source(&&error, &mut scopes, None, ScopeEnd::Unbounded, &mut ctx);
        assert_eq!(source.kind, RowsSourceKind::Unrecognized);
        let outer = RowsSourceContext::empty();
        assert!(RowsSourceContext::ptr_eq(&source.resolve_row_sources(&outer, &mut ctx), &outer));
        assert_eq!(ctx.statistics().malformed_subtrees, 1);
    }
}
