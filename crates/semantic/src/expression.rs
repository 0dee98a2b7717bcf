// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Value expressions
//!
//! Column references, literals, function calls, compound expressions and
//! scalar subqueries.
//!
//! Both resolution passes fill fields that start out empty and never revise
//! them: a column reference keeps the first source and binding it resolves
//! to, so running a pass again changes nothing.

use crate::context::RecognitionContext;
use crate::diagnostics::{DiagnosticKind, suggestions};
use crate::error::SemanticError;
use crate::rows_data_context::RowsDataContext;
use crate::rows_source_context::{RowsSourceContext, SourceBinding};
use crate::scope::{ScopeId, ScopeTree};
use crate::statement::select::{SelectModel, recognize_select};
use crate::symbol::ColumnSymbol;
use sqlscope_ir::{DataType, Identifier, QualifiedName, ScopeEnd, TextInterval};
use sqlscope_syntax::SyntaxNode;

/// Operators producing a boolean
const PREDICATE_OPERATORS: &[&str] = &[
    "=", "<>", "!=", "<", ">", "<=", ">=", "AND", "OR", "NOT", "IN", "LIKE", "ILIKE", "IS",
    "EXISTS", "BETWEEN",
];

/// Operators producing a value of their operands' type
const ARITHMETIC_OPERATORS: &[&str] = &["+", "-", "*", "/", "%"];

/// A recognized value expression
#[derive(Debug, Clone, PartialEq)]
pub struct ValueExpression {
    pub interval: TextInterval,
    pub kind: ExpressionKind,
    /// Result type, set by the data pass when it can be determined
    pub data_type: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Column(ColumnReference),
    Literal {
        text: String,
    },
    FunctionCall {
        name: Option<Identifier>,
        args: Vec<ValueExpression>,
    },
    /// Operator application or parenthesized list
    Compound {
        /// Upper-cased operator tokens (`"="`, `"NOT IN"`), `None` for lists
        operator: Option<String>,
        operands: Vec<ValueExpression>,
    },
    Subquery(Box<SelectModel>),
    /// `*` or `t.*`
    Star {
        qualifier: Vec<Identifier>,
    },
    /// Malformed or unsupported input
    Unrecognized,
}

/// Reference to a column, possibly qualified
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub name: QualifiedName,
    /// Row source the qualifier (or the single local source) refers to
    pub source: Option<SourceBinding>,
    /// Column the reference binds to
    pub binding: Option<ColumnSymbol>,
}

impl ColumnReference {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            source: None,
            binding: None,
        }
    }

    pub fn column(&self) -> Option<&Identifier> {
        self.name.name()
    }

    pub fn qualifier(&self) -> &[Identifier] {
        self.name.qualifier()
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.is_some()
    }

    fn resolve_row_sources(
        &mut self,
        interval: TextInterval,
        context: &RowsSourceContext,
        ctx: &mut RecognitionContext,
    ) {
        if self.source.is_some() {
            return;
        }
        let qualifier = self.name.qualifier();
        if qualifier.is_empty() {
            self.source = context.sole_source().cloned();
            return;
        }
        match context.find(qualifier) {
            Some(source) => self.source = Some(source.clone()),
            None => {
                let text = QualifiedName::new(qualifier.to_vec()).to_string();
                let names = context
                    .sources()
                    .iter()
                    .filter_map(|s| s.name.as_ref().map(|n| n.text.as_str()));
                let message = with_suggestions(
                    SemanticError::UnknownQualifier(text.clone()).to_string(),
                    suggestions(&text, names),
                );
                ctx.report(DiagnosticKind::UnresolvedSymbol, interval, message);
            }
        }
    }

    fn resolve_value_relations(
        &mut self,
        interval: TextInterval,
        data: &RowsDataContext,
        ctx: &mut RecognitionContext,
    ) {
        if self.binding.is_some() {
            return;
        }
        let Some(column) = self.name.name() else {
            return;
        };
        match data.resolve_column(self.name.qualifier(), column) {
            Ok(Some(binding)) => self.binding = Some(binding),
            Ok(None) => {}
            // already reported by the structural pass
            Err(SemanticError::UnknownQualifier(_)) => {}
            Err(err @ SemanticError::ColumnNotFound(_)) => {
                let candidates: Vec<&str> = match data.find_table(self.name.qualifier()) {
                    Some(table) => table.columns.iter().map(|c| c.name.text.as_str()).collect(),
                    None => data.visible_columns().map(|c| c.name.text.as_str()).collect(),
                };
                let message = with_suggestions(err.to_string(), suggestions(&column.text, candidates));
                ctx.report(DiagnosticKind::UnresolvedSymbol, interval, message);
            }
            Err(err) => ctx.report(DiagnosticKind::UnresolvedSymbol, interval, err.to_string()),
        }
    }
}

fn with_suggestions(message: String, candidates: Vec<String>) -> String {
    if candidates.is_empty() {
        message
    } else {
        format!("{message}. Did you mean: {}?", candidates.join(", "))
    }
}

impl ValueExpression {
    pub fn new(interval: TextInterval, kind: ExpressionKind) -> Self {
        Self {
            interval,
            kind,
            data_type: None,
        }
    }

    pub fn unrecognized(interval: TextInterval) -> Self {
        Self::new(interval, ExpressionKind::Unrecognized)
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self.kind, ExpressionKind::Unrecognized)
    }

    pub fn as_column(&self) -> Option<&ColumnReference> {
        match &self.kind {
            ExpressionKind::Column(column) => Some(column),
            _ => None,
        }
    }

    /// Every column reference in this expression, nested subqueries excluded
    pub fn column_references(&self) -> Vec<&ColumnReference> {
        let mut found = Vec::new();
        self.collect_columns(&mut found);
        found
    }

    fn collect_columns<'a>(&'a self, found: &mut Vec<&'a ColumnReference>) {
        match &self.kind {
            ExpressionKind::Column(column) => found.push(column),
            ExpressionKind::FunctionCall { args: operands, .. }
            | ExpressionKind::Compound { operands, .. } => {
                for operand in operands {
                    operand.collect_columns(found);
                }
            }
            _ => {}
        }
    }

    /// Structural pass: bind qualifiers to visible row sources
    pub fn resolve_row_sources(&mut self, context: &RowsSourceContext, ctx: &mut RecognitionContext) {
        let interval = self.interval;
        match &mut self.kind {
            ExpressionKind::Column(column) => column.resolve_row_sources(interval, context, ctx),
            ExpressionKind::FunctionCall { args: operands, .. }
            | ExpressionKind::Compound { operands, .. } => {
                for operand in operands {
                    operand.resolve_row_sources(context, ctx);
                }
            }
            ExpressionKind::Subquery(query) => {
                query.resolve_object_and_rows_references(&context.nested(), ctx);
            }
            ExpressionKind::Star { qualifier } => {
                if !qualifier.is_empty() && context.find(qualifier).is_none() {
                    let text = QualifiedName::new(qualifier.clone()).to_string();
                    ctx.report(
                        DiagnosticKind::UnresolvedSymbol,
                        interval,
                        SemanticError::UnknownQualifier(text).to_string(),
                    );
                }
            }
            ExpressionKind::Literal { .. } | ExpressionKind::Unrecognized => {}
        }
    }

    /// Data pass: bind columns and compute result types
    pub fn resolve_value_relations(
        &mut self,
        data: &RowsDataContext,
        scopes: &mut ScopeTree,
        ctx: &mut RecognitionContext,
    ) {
        let interval = self.interval;
        match &mut self.kind {
            ExpressionKind::Column(column) => {
                column.resolve_value_relations(interval, data, ctx);
                if self.data_type.is_none() {
                    self.data_type = column.binding.as_ref().and_then(|b| b.data_type.clone());
                }
            }
            ExpressionKind::Literal { text } => {
                if self.data_type.is_none() {
                    self.data_type = Some(DataType::of_literal(text));
                }
            }
            ExpressionKind::FunctionCall { name, args } => {
                for arg in args.iter_mut() {
                    arg.resolve_value_relations(data, scopes, ctx);
                }
                if self.data_type.is_none() {
                    self.data_type = name
                        .as_ref()
                        .and_then(|n| ctx.metadata()?.function(&n.text))
                        .map(|f| f.return_type.clone());
                }
            }
            ExpressionKind::Compound { operator, operands } => {
                for operand in operands.iter_mut() {
                    operand.resolve_value_relations(data, scopes, ctx);
                }
                if self.data_type.is_none() {
                    self.data_type = compound_type(operator.as_deref(), operands);
                }
            }
            ExpressionKind::Subquery(query) => {
                query.resolve_value_relations(&data.nested(), scopes, ctx);
                if self.data_type.is_none() {
                    self.data_type = query.single_output_type();
                }
            }
            ExpressionKind::Star { .. } | ExpressionKind::Unrecognized => {}
        }
    }
}

fn compound_type(operator: Option<&str>, operands: &[ValueExpression]) -> Option<DataType> {
    let operator = operator?;
    let head = operator.split_whitespace().next().unwrap_or(operator);
    let head = if head == "NOT" {
        operator.split_whitespace().nth(1).unwrap_or(head)
    } else {
        head
    };
    if PREDICATE_OPERATORS.contains(&head) {
        return Some(DataType::Boolean);
    }
    if operator == "||" {
        return Some(DataType::Text);
    }
    if ARITHMETIC_OPERATORS.contains(&operator) {
        return operands
            .iter()
            .filter_map(|o| o.data_type.clone())
            .find(DataType::is_numeric);
    }
    None
}

/// Name parts of an identifier, column reference or object name node
pub(crate) fn name_parts<N: SyntaxNode>(node: &N, ctx: &RecognitionContext) -> Vec<Identifier> {
    let rules = *ctx.rules();
    if node.kind() == rules.identifier {
        return vec![ctx.identifier(&node.text_content())];
    }
    let parts: Vec<Identifier> = node
        .children()
        .iter()
        .filter(|c| c.kind() == rules.identifier)
        .map(|c| ctx.identifier(&c.text_content()))
        .collect();
    if !parts.is_empty() {
        return parts;
    }
    node.text_content()
        .split('.')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| ctx.identifier(p))
        .collect()
}

/// Alias declared by an `alias` child (`AS u` or just `u`)
pub(crate) fn alias_of<N: SyntaxNode>(node: &N, ctx: &RecognitionContext) -> Option<Identifier> {
    let rules = *ctx.rules();
    let alias = node.find_first_child_of_name(rules.alias)?;
    let text = match alias.find_first_child_of_name(rules.identifier) {
        Some(ident) => ident.text_content(),
        None if alias.children().is_empty() => alias.text_content(),
        None => return None,
    };
    Some(ctx.identifier(&text))
}

/// Recognize a value expression node
///
/// Subquery clauses become scopes nested under `parent`.
pub fn recognize_expression<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> ValueExpression {
    let rules = *ctx.rules();
    let interval = node.interval();
    let kind = node.kind();

    if node.is_error() || kind == rules.unexpected {
        ctx.report(
            DiagnosticKind::MalformedSubtree,
            interval,
            format!("Unexpected input: {}", node.text_content().trim()),
        );
        return ValueExpression::unrecognized(interval);
    }

    if kind == rules.column_reference || kind == rules.identifier {
        let name = QualifiedName::new(name_parts(node, ctx));
        return ValueExpression::new(interval, ExpressionKind::Column(ColumnReference::new(name)));
    }

    if kind == rules.literal {
        let text = node.text_content();
        return ValueExpression::new(interval, ExpressionKind::Literal { text });
    }

    if kind == rules.star {
        let qualifier = node
            .children()
            .iter()
            .filter(|c| c.kind() == rules.identifier)
            .map(|c| ctx.identifier(&c.text_content()))
            .collect();
        return ValueExpression::new(interval, ExpressionKind::Star { qualifier });
    }

    if kind == rules.subquery {
        return recognize_subquery(node, scopes, parent, ctx);
    }

    if kind == rules.function_call {
        let mut parts = node.children().into_iter().filter(|c| !c.is_token());
        let name = parts.next().map(|n| ctx.identifier(&n.text_content()));
        let args = recognize_operands(parts, scopes, parent, ctx);
        return ValueExpression::new(interval, ExpressionKind::FunctionCall { name, args });
    }

    if kind == rules.parenthesized_expression {
        if !ctx.enter_nested(interval) {
            return ValueExpression::unrecognized(interval);
        }
        let inner = node
            .find_first_non_error_child()
            .map(|inner| recognize_expression(&inner, scopes, parent, ctx));
        ctx.exit_nested();
        return inner.unwrap_or_else(|| {
            ctx.report(DiagnosticKind::StructuralGap, interval, "Empty parentheses");
            ValueExpression::unrecognized(interval)
        });
    }

    let tokens: Vec<String> = node
        .tokens()
        .iter()
        .map(|t| t.text_content().to_ascii_uppercase())
        .filter(|t| t != "(" && t != ")" && t != ",")
        .collect();
    let operator = if kind == rules.expression_list || tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    };
    let operands = recognize_operands(node.children(), scopes, parent, ctx);

    // wrapper rules around a single expression
    if operator.is_none() && kind != rules.expression_list {
        if operands.len() <= 1 {
            return operands
                .into_iter()
                .next()
                .unwrap_or_else(|| ValueExpression::unrecognized(interval));
        }
    }
    ValueExpression::new(interval, ExpressionKind::Compound { operator, operands })
}

/// Recognize the named children among `nodes`, dropping malformed ones
pub(crate) fn recognize_operands<N: SyntaxNode>(
    nodes: impl IntoIterator<Item = N>,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> Vec<ValueExpression> {
    nodes
        .into_iter()
        .filter(|n| !n.is_token())
        .map(|n| recognize_expression(&n, scopes, parent, ctx))
        .filter(|e| !e.is_unrecognized())
        .collect()
}

fn recognize_subquery<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    parent: Option<ScopeId>,
    ctx: &mut RecognitionContext,
) -> ValueExpression {
    let rules = *ctx.rules();
    let interval = node.interval();
    let Some(select) = node.find_first_child_of_name(rules.select_statement) else {
        ctx.report(DiagnosticKind::MalformedSubtree, interval, "Subquery without SELECT");
        return ValueExpression::unrecognized(interval);
    };
    if !ctx.enter_nested(interval) {
        return ValueExpression::unrecognized(interval);
    }
    let enclosing = parent
        .and_then(|id| scopes.get(id))
        .map_or(ScopeEnd::Bounded(interval.end), |scope| scope.interval.end);
    let closing = nested_closing(node, enclosing);
    let query = recognize_select(&select, scopes, parent, closing, ctx);
    ctx.exit_nested();
    ValueExpression::new(interval, ExpressionKind::Subquery(Box::new(query)))
}

/// Where the last scope of a parenthesized SELECT ends
///
/// A closed subquery bounds its scopes at the `)`. While the `)` is still
/// missing they run on to the end of the enclosing scope.
pub(crate) fn nested_closing<N: SyntaxNode>(subquery: &N, enclosing: ScopeEnd) -> ScopeEnd {
    let own_end = ScopeEnd::Bounded(subquery.end());
    if subquery.find_token(")").is_some() {
        own_end
    } else {
        enclosing.max(own_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_ir::DialectCapabilities;
    use sqlscope_syntax::MockSyntaxNode;

    fn ctx() -> RecognitionContext {
        RecognitionContext::new(DialectCapabilities::default())
    }

    fn column(text: &str, start: usize) -> MockSyntaxNode {
        let mut node = MockSyntaxNode::new("column_reference");
        let mut offset = start;
        for (i, part) in text.split('.').enumerate() {
            if i > 0 {
                node = node.with_child(MockSyntaxNode::punct(".", offset));
                offset += 1;
            }
            node = node.with_child(MockSyntaxNode::leaf("identifier", part, offset));
            offset += part.len();
        }
        node.fit_to_children()
    }

    // u.id = 1
    fn comparison() -> MockSyntaxNode {
        MockSyntaxNode::new("binary_expression")
            .with_child(column("u.id", 0))
            .with_child(MockSyntaxNode::punct("=", 5))
            .with_child(MockSyntaxNode::leaf("literal", "1", 7))
            .fit_to_children()
    }

    #[test]
    fn test_recognize_comparison() {
        let mut scopes = ScopeTree::new();
        let mut ctx = ctx();
        let expr = recognize_expression(&&comparison(), &mut scopes, None, &mut ctx);

        let ExpressionKind::Compound { operator, operands } = &expr.kind else {
            panic!("expected compound, got {:?}", expr.kind);
        };
        assert_eq!(operator.as_deref(), Some("="));
        assert_eq!(operands.len(), 2);
        let reference = operands[0].as_column().unwrap();
        assert_eq!(reference.name.to_string(), "u.id");
        assert_eq!(expr.column_references().len(), 1);
    }

    #[test]
    fn test_unknown_qualifier_reported_once() {
        let mut scopes = ScopeTree::new();
        let mut ctx = ctx();
        let mut expr = recognize_expression(&&comparison(), &mut scopes, None, &mut ctx);
        let users = SourceBinding::table(
            QualifiedName::simple(Identifier::new("users")),
            Some(Identifier::new("us")),
            TextInterval::new(20, 25),
        );
        let context = RowsSourceContext::empty().with_source(users);

        expr.resolve_row_sources(&context, &mut ctx);
        expr.resolve_row_sources(&context, &mut ctx);

        let diagnostics = ctx.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].interval, TextInterval::new(0, 4));
        assert_eq!(diagnostics[0].message, "Unknown table or alias: u. Did you mean: us?");
    }

    #[test]
    fn test_literal_and_predicate_types() {
        let mut scopes = ScopeTree::new();
        let mut ctx = ctx();
        let mut expr = recognize_expression(&&comparison(), &mut scopes, None, &mut ctx);
        expr.resolve_value_relations(&RowsDataContext::empty(), &mut scopes, &mut ctx);
        assert_eq!(expr.data_type, Some(DataType::Boolean));
        let ExpressionKind::Compound { operands, .. } = &expr.kind else {
            unreachable!()
        };
        assert_eq!(operands[1].data_type, Some(DataType::Integer));
    }

    #[test]
    fn test_unexpected_node_is_dropped() {
        let node = MockSyntaxNode::new("expression_list")
            .with_child(MockSyntaxNode::punct("(", 0))
            .with_child(MockSyntaxNode::leaf("literal", "1", 1))
            .with_child(MockSyntaxNode::leaf("unexpected", ",,", 2))
            .with_child(MockSyntaxNode::punct(")", 4))
            .fit_to_children();
        let mut scopes = ScopeTree::new();
        let mut ctx = ctx();
        let expr = recognize_expression(&&node, &mut scopes, None, &mut ctx);
        let ExpressionKind::Compound { operator, operands } = &expr.kind else {
            unreachable!()
        };
        assert!(operator.is_none());
        assert_eq!(operands.len(), 1);
        assert_eq!(ctx.statistics().malformed_subtrees, 1);
    }

    #[test]
    fn test_parenthesized_depth_limit() {
        let mut node = MockSyntaxNode::leaf("literal", "1", 3);
        for depth in (0..3).rev() {
            node = MockSyntaxNode::new("parenthesized_expression")
                .with_child(MockSyntaxNode::punct("(", depth))
                .with_child(node)
                .with_child(MockSyntaxNode::punct(")", 6 - depth))
                .fit_to_children();
        }
        let mut scopes = ScopeTree::new();
        let mut ctx = ctx().with_max_depth(2);
        let expr = recognize_expression(&&node, &mut scopes, None, &mut ctx);
        assert!(expr.is_unrecognized());
        assert_eq!(ctx.statistics().malformed_subtrees, 1);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_nested_closing_follows_parenthesis() {
        let select = MockSyntaxNode::new("select_statement")
            .with_child(MockSyntaxNode::keyword("SELECT", 1))
            .fit_to_children();
        let open = MockSyntaxNode::new("subquery")
            .with_child(MockSyntaxNode::punct("(", 0))
            .with_child(select)
            .fit_to_children();
        let closed = open.clone().with_child(MockSyntaxNode::punct(")", 7)).fit_to_children();

        assert_eq!(nested_closing(&&closed, ScopeEnd::Unbounded), ScopeEnd::Bounded(8));
        assert_eq!(nested_closing(&&open, ScopeEnd::Unbounded), ScopeEnd::Unbounded);
        assert_eq!(nested_closing(&&open, ScopeEnd::Bounded(3)), ScopeEnd::Bounded(7));
    }

    #[test]
    fn test_compound_type() {
        let typed = |t: DataType| ValueExpression {
            interval: TextInterval::default(),
            kind: ExpressionKind::Literal { text: String::new() },
            data_type: Some(t),
        };
        assert_eq!(compound_type(Some("NOT IN"), &[]), Some(DataType::Boolean));
        assert_eq!(compound_type(Some("||"), &[]), Some(DataType::Text));
        assert_eq!(
            compound_type(Some("+"), &[typed(DataType::Text), typed(DataType::Decimal)]),
            Some(DataType::Decimal)
        );
        assert_eq!(compound_type(None, &[]), None);
    }
}
