// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Clause boundary helpers
//!
//! Scope intervals start right after the keyword(s) introducing a clause and
//! end where the next clause starts. These helpers find those offsets on any
//! [`SyntaxNode`].

use crate::node::SyntaxNode;

/// Whether `node` is a keyword token (alphabetic text, no punctuation)
pub fn is_keyword_token<N: SyntaxNode>(node: &N) -> bool {
    if !node.is_token() {
        return false;
    }
    let text = node.text_content();
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}

/// End offset of the run of keyword tokens opening `clause`
///
/// `ORDER BY x` yields the end of `BY`. Returns `None` when the clause does not
/// start with a keyword (the parser lost it).
pub fn introducing_keyword_end<N: SyntaxNode>(clause: &N) -> Option<usize> {
    clause
        .children()
        .into_iter()
        .take_while(is_keyword_token)
        .last()
        .map(|kw| kw.end())
}

/// End of the first direct token equal to `text`, if any
pub fn token_end<N: SyntaxNode>(node: &N, text: &str) -> Option<usize> {
    node.find_token(text).map(|t| t.end())
}

/// Start offsets of direct punctuation tokens equal to `separator`
pub fn separator_offsets<N: SyntaxNode>(node: &N, separator: &str) -> Vec<usize> {
    node.tokens()
        .into_iter()
        .filter(|t| t.text_content() == separator)
        .map(|t| t.start())
        .collect()
}

/// Keyword texts opening `clause`, upper-cased and joined by a space
pub fn leading_keywords<N: SyntaxNode>(clause: &N) -> String {
    clause
        .children()
        .into_iter()
        .take_while(is_keyword_token)
        .map(|kw| kw.text_content().to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockSyntaxNode;

    fn order_by() -> MockSyntaxNode {
        // ORDER BY a, b
        MockSyntaxNode::new("order_by_clause")
            .with_child(MockSyntaxNode::keyword("ORDER", 0))
            .with_child(MockSyntaxNode::keyword("BY", 6))
            .with_child(MockSyntaxNode::leaf("order_by_item", "a", 9))
            .with_child(MockSyntaxNode::punct(",", 10))
            .with_child(MockSyntaxNode::leaf("order_by_item", "b", 12))
            .fit_to_children()
    }

    #[test]
    fn test_introducing_keyword_end() {
        let clause = order_by();
        assert_eq!(introducing_keyword_end(&&clause), Some(8));
        assert_eq!(leading_keywords(&&clause), "ORDER BY");
    }

    #[test]
    fn test_missing_keyword() {
        let clause = MockSyntaxNode::new("where_clause")
            .with_child(MockSyntaxNode::leaf("identifier", "c", 0))
            .fit_to_children();
        assert_eq!(introducing_keyword_end(&&clause), None);
    }

    #[test]
    fn test_separators() {
        let clause = order_by();
        assert_eq!(separator_offsets(&&clause, ","), vec![10]);
        assert_eq!(token_end(&&clause, "by"), Some(8));
        assert!(!is_keyword_token(&&MockSyntaxNode::punct(",", 0)));
    }
}
