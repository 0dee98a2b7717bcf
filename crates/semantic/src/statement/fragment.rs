// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! Script items that are not a recognized statement: orphan clauses, error
//! recovery islands, text typed after a statement without a terminator.

use crate::scope::{ScopeRole, ScopeTree};
use sqlscope_ir::{ScopeEnd, TextInterval, compute_scope_interval};
use sqlscope_syntax::SyntaxNode;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentModel {
    pub interval: TextInterval,
    /// Rule name of the root node
    pub kind: String,
}

/// Recognize a fragment
///
/// The single scope covers the whole fragment and takes its origin from the
/// preceding statement's tail scope, if any.
pub fn recognize_fragment<N: SyntaxNode>(
    node: &N,
    scopes: &mut ScopeTree,
    closing: ScopeEnd,
) -> FragmentModel {
    let id = scopes.add(ScopeRole::Fragment, compute_scope_interval(node.start(), closing), None);
    if let Some(scope) = scopes.get_mut(id) {
        scope.adopts_tail = true;
    }
    debug!(kind = node.kind(), interval = %node.interval(), "Unrecognized statement kept as fragment");
    FragmentModel {
        interval: node.interval(),
        kind: node.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_ir::UNBOUNDED;
    use sqlscope_syntax::MockSyntaxNode;

    #[test]
    fn test_fragment_scope_adopts_tail() {
        let node = MockSyntaxNode::new("where_clause")
            .with_child(MockSyntaxNode::keyword("WHERE", 3))
            .fit_to_children();
        let mut scopes = ScopeTree::new();
        let fragment = recognize_fragment(&&node, &mut scopes, UNBOUNDED);

        assert_eq!(fragment.kind, "where_clause");
        let scope = scopes.scope_at(3).unwrap();
        assert_eq!(scope.role, ScopeRole::Fragment);
        assert!(scope.adopts_tail);
        assert!(scope.interval.is_unbounded());
    }
}
