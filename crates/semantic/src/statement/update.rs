// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # UPDATE
//!
//! ```text
//! UPDATE t SET a=1, b=2 WHERE c=3
//!        |    |-a-| |-b-|      |------ conditions (tail)
//!        |    |---targets---|
//!        table references
//! ```
//!
//! Assignment targets resolve against the target table only. Assignment
//! values, WHERE, ORDER BY and LIMIT see the target combined with the
//! `FROM` sources. The conditions scope covers WHERE and ORDER BY.

use super::{
    clause_expression, clause_expressions, check_extension, combine_sides, data_ref_origin,
    extend_outer, recognize_target, set_origin, syntax_origin,
};
use crate::context::RecognitionContext;
use crate::diagnostics::DiagnosticKind;
use crate::expression::{ValueExpression, recognize_expression};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source::RowsSourceModel;
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{ClauseSegment, ScopeId, ScopeRole, ScopeTree, SymbolOrigin, open_clause_scopes};
use crate::statement::select::recognize_from_items;
use sqlscope_ir::{ClauseExtension, ScopeEnd, TextInterval, compute_scope_interval};
use sqlscope_syntax::{SyntaxNode, introducing_keyword_end, token_end};
use tracing::trace;

/// One `target = value` pair of the SET list
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub interval: TextInterval,
    /// Assigned columns; several for `(a, b) = (...)`
    pub targets: Vec<ValueExpression>,
    pub value: Option<ValueExpression>,
    /// Scope of the value, nested in the assignment targets scope
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateScopes {
    pub table_references: Option<ScopeId>,
    pub assignment_targets: Option<ScopeId>,
    pub sources: Option<ScopeId>,
    pub conditions: Option<ScopeId>,
    pub limit: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateModel {
    pub interval: TextInterval,
    pub target: Option<RowsSourceModel>,
    pub assignments: Vec<Assignment>,
    pub from: Vec<RowsSourceModel>,
    pub filter: Option<ValueExpression>,
    pub order_by: Vec<ValueExpression>,
    pub limit: Vec<ValueExpression>,
    pub scopes: UpdateScopes,
}

impl UpdateModel {
    /// Every assigned column, in text order
    pub fn assigned_columns(&self) -> impl Iterator<Item = &ValueExpression> {
        self.assignments.iter().flat_map(|a| a.targets.iter())
    }

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
        for column in self.assignments.iter_mut().flat_map(|a| a.targets.iter_mut()) {
            column.resolve_row_sources(&own, ctx);
        }

        let mut sources = outer.clone();
        for source in &mut self.from {
            sources = source.resolve_row_sources(&sources, ctx);
        }
        let combined = combine_sides(outer, &target, &sources);

        let expressions = self
            .assignments
            .iter_mut()
            .filter_map(|a| a.value.as_mut())
            .chain(self.filter.iter_mut())
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
        let (own, target) = match &mut self.target {
            Some(table) => {
                let own = table.resolve_value_relations(&RowsDataContext::empty(), scopes, ctx);
                let target = extend_outer(outer, &own);
                (own, target)
            }
            None => (RowsDataContext::empty(), outer.clone()),
        };
        for column in self.assignments.iter_mut().flat_map(|a| a.targets.iter_mut()) {
            column.resolve_value_relations(&own, scopes, ctx);
        }

        let mut sources = outer.clone();
        for source in &mut self.from {
            sources = source.resolve_value_relations(&sources, scopes, ctx);
        }
        let combined = combine_sides(outer, &target, &sources);

        for assignment in &mut self.assignments {
            if let Some(value) = &mut assignment.value {
                value.resolve_value_relations(&combined, scopes, ctx);
            }
            set_origin(scopes, assignment.scope, syntax_origin(&combined));
        }
        let expressions = self
            .filter
            .iter_mut()
            .chain(self.order_by.iter_mut())
            .chain(self.limit.iter_mut());
        for expr in expressions {
            expr.resolve_value_relations(&combined, scopes, ctx);
        }

        set_origin(scopes, self.scopes.table_references, SymbolOrigin::Empty);
        set_origin(scopes, self.scopes.assignment_targets, data_ref_origin(&own));
        set_origin(scopes, self.scopes.sources, syntax_origin(outer));
        set_origin(scopes, self.scopes.conditions, syntax_origin(&combined));
        set_origin(scopes, self.scopes.limit, SymbolOrigin::Empty);
        trace!(
            assignments = self.assignments.len(),
            tables = combined.tables().len(),
            "Resolved UPDATE"
        );
        combined
    }
}

/// Recognize an UPDATE statement
pub fn recognize_update<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    closing: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> UpdateModel {
    let rules = *ctx.rules();
    let set_clause = node.find_first_child_of_name(rules.set_clause);
    let from_clause = node.find_first_child_of_name(rules.from_clause);
    let where_clause = node.find_first_child_of_name(rules.where_clause);
    let order_by_clause = node.find_first_child_of_name(rules.order_by_clause);
    let limit_clause = node.find_first_child_of_name(rules.limit_clause);

    let mut segments = vec![ClauseSegment::new(
        ScopeRole::TableReferences,
        node.start(),
        introducing_keyword_end(node),
    )];
    if let Some(set) = &set_clause {
        segments.push(ClauseSegment::new(ScopeRole::AssignmentTargets, set.start(), introducing_keyword_end(set)));
    }
    if let Some(from) = &from_clause {
        segments.push(ClauseSegment::new(ScopeRole::Sources, from.start(), introducing_keyword_end(from)));
    }
    // WHERE and ORDER BY share one scope
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
    let update_scopes = UpdateScopes {
        table_references: opened.get(ScopeRole::TableReferences),
        assignment_targets: opened.get(ScopeRole::AssignmentTargets),
        sources: opened.get(ScopeRole::Sources),
        conditions: opened.get(ScopeRole::Conditions),
        limit: opened.get(ScopeRole::Limit),
    };
    let scope_end = |scopes: &ScopeTree, id: Option<ScopeId>| {
        id.and_then(|id| scopes.get(id)).map_or(closing, |s| s.interval.end)
    };

    let mut model = UpdateModel {
        interval: node.interval(),
        target: None,
        assignments: Vec::new(),
        from: Vec::new(),
        filter: None,
        order_by: Vec::new(),
        limit: Vec::new(),
        scopes: update_scopes,
    };

    let target_end = scope_end(scopes, update_scopes.table_references);
    model.target = recognize_target(node, "UPDATE", scopes, update_scopes.table_references, target_end, ctx);

    match &set_clause {
        Some(set) if !ctx.check_cancelled(set.start()) => {
            let targets_end = scope_end(scopes, update_scopes.assignment_targets);
            model.assignments =
                recognize_assignments(set, scopes, update_scopes.assignment_targets, targets_end, ctx);
        }
        Some(_) => return model,
        None => ctx.report(DiagnosticKind::StructuralGap, node.interval(), "UPDATE without SET"),
    }

    if let Some(from) = &from_clause {
        if ctx.check_cancelled(from.start()) {
            return model;
        }
        check_extension(from, ClauseExtension::UpdateFrom, ctx);
        let sources_end = scope_end(scopes, update_scopes.sources);
        model.from = recognize_from_items(from, scopes, update_scopes.sources, sources_end, ctx);
    }
    if let Some(clause) = &where_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        model.filter = clause_expression(clause, scopes, update_scopes.conditions, ctx);
    }
    if let Some(clause) = &order_by_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        check_extension(clause, ClauseExtension::UpdateOrderLimit, ctx);
        model.order_by = clause_expressions(
            clause,
            Some(rules.order_by_item),
            scopes,
            update_scopes.conditions,
            ctx,
        );
    }
    if let Some(clause) = &limit_clause {
        if ctx.check_cancelled(clause.start()) {
            return model;
        }
        check_extension(clause, ClauseExtension::UpdateOrderLimit, ctx);
        model.limit = clause_expressions(clause, None, scopes, update_scopes.limit, ctx);
    }
    model
}

/// Assignments of a SET clause
///
/// A list containing malformed input contributes no assignments.
fn recognize_assignments<N: SyntaxNode>(
    set: &N,
    scopes: &mut ScopeTree,
    targets_scope: Option<ScopeId>,
    targets_end: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> Vec<Assignment> {
    let rules = *ctx.rules();
    let children = set.children();
    if let Some(bad) = children
        .iter()
        .find(|c| c.is_error() || c.kind() == rules.unexpected)
    {
        ctx.report(
            DiagnosticKind::MalformedSubtree,
            bad.interval(),
            format!("Malformed SET list: {}", bad.text_content().trim()),
        );
        return Vec::new();
    }

    let separators: Vec<usize> = children
        .iter()
        .filter(|c| c.is_token() && c.text_content() == ",")
        .map(|c| c.start())
        .collect();
    let assignments: Vec<N> = children
        .into_iter()
        .filter(|c| c.kind() == rules.assignment)
        .collect();
    if assignments.is_empty() {
        ctx.report(DiagnosticKind::StructuralGap, set.interval(), "SET without assignments");
    }

    assignments
        .iter()
        .map(|node| {
            let value_end = separators
                .iter()
                .find(|&&sep| sep >= node.end())
                .map_or(targets_end, |&sep| ScopeEnd::Bounded(sep));
            recognize_assignment(node, scopes, targets_scope, value_end, ctx)
        })
        .collect()
}

fn recognize_assignment<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    targets_scope: Option<ScopeId>,
    value_end: ScopeEnd,
    ctx: &mut RecognitionContext,
) -> Assignment {
    let rules = *ctx.rules();
    let interval = node.interval();
    let equals_end = token_end(node, "=");
    let (before, after): (Vec<N>, Vec<N>) = node
        .children()
        .into_iter()
        .filter(|c| !c.is_token())
        .partition(|c| equals_end.is_none_or(|eq| c.start() < eq));

    let targets = match before.first() {
        Some(target) if target.is_error() || target.kind() == rules.unexpected => {
            ctx.report(
                DiagnosticKind::MalformedSubtree,
                target.interval(),
                format!("Malformed assignment target: {}", target.text_content().trim()),
            );
            Vec::new()
        }
        Some(target) if target.kind() == rules.column_list => target
            .children()
            .into_iter()
            .filter(|c| c.kind() == rules.column_reference || c.kind() == rules.identifier)
            .map(|c| recognize_expression(&c, scopes, targets_scope, ctx))
            .collect(),
        Some(target) => {
            let expr = recognize_expression(target, scopes, targets_scope, ctx);
            if expr.as_column().is_some() {
                vec![expr]
            } else {
                ctx.report(
                    DiagnosticKind::StructuralGap,
                    target.interval(),
                    "Assignment target is not a column",
                );
                Vec::new()
            }
        }
        None => {
            ctx.report(DiagnosticKind::StructuralGap, interval, "Assignment without a target column");
            Vec::new()
        }
    };

    let Some(equals_end) = equals_end else {
        ctx.report(DiagnosticKind::StructuralGap, interval, "Assignment without '='");
        return Assignment {
            interval,
            targets,
            value: None,
            scope: None,
        };
    };
    let scope = scopes.add(
        ScopeRole::AssignmentValue,
        compute_scope_interval(equals_end, value_end),
        targets_scope,
    );
    let value = after
        .first()
        .map(|v| recognize_expression(v, scopes, Some(scope), ctx))
        .filter(|v| !v.is_unrecognized());
    Assignment {
        interval,
        targets,
        value,
        scope: Some(scope),
    }
}
