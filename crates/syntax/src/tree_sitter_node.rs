// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Tree-sitter adapter
//!
//! Wraps a `tree_sitter::Node` together with the source text of its script
//! item. Anonymous nodes (keywords, punctuation) are tokens; `ERROR` and
//! `MISSING` nodes are errors.

use crate::node::SyntaxNode;
use sqlscope_ir::TextInterval;

/// Tree-sitter node plus the source it was parsed from
#[derive(Debug, Clone, Copy)]
pub struct TreeSitterNode<'t> {
    node: tree_sitter::Node<'t>,
    source: &'t str,
}

impl<'t> TreeSitterNode<'t> {
    pub fn new(node: tree_sitter::Node<'t>, source: &'t str) -> Self {
        Self { node, source }
    }

    /// Root node of a parsed tree
    pub fn root(tree: &'t tree_sitter::Tree, source: &'t str) -> Self {
        Self::new(tree.root_node(), source)
    }

    /// Underlying tree-sitter node
    pub fn inner(&self) -> tree_sitter::Node<'t> {
        self.node
    }
}

impl<'t> SyntaxNode for TreeSitterNode<'t> {
    fn kind(&self) -> &str {
        self.node.kind()
    }

    fn interval(&self) -> TextInterval {
        TextInterval::new(self.node.start_byte(), self.node.end_byte())
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|child| Self::new(child, self.source))
            .collect()
    }

    fn is_error(&self) -> bool {
        self.node.is_error() || self.node.is_missing()
    }

    fn is_token(&self) -> bool {
        !self.node.is_named()
    }

    fn text_content(&self) -> String {
        self.node
            .utf8_text(self.source.as_bytes())
            .map(str::to_string)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_json::LANGUAGE.into())
            .expect("json grammar");
        parser.parse(source, None).expect("parse")
    }

    fn collect<'t>(node: TreeSitterNode<'t>, out: &mut Vec<TreeSitterNode<'t>>) {
        out.push(node);
        for child in node.children() {
            collect(child, out);
        }
    }

    #[test]
    fn test_root_covers_source() {
        let source = r#"{"id": 1, "name": "x"}"#;
        let tree = parse(source);
        let root = TreeSitterNode::root(&tree, source);
        assert_eq!(root.interval(), TextInterval::new(0, source.len()));
        assert_eq!(root.text_content(), source);
        assert!(!root.has_error());

        let object = root.find_first_non_error_child().unwrap();
        assert_eq!(object.kind(), "object");
        assert_eq!(object.find_children_of_name("pair").len(), 2);
        assert_eq!(object.first_token().map(|t| t.text_content()), Some("{".to_string()));
        assert_eq!(object.find_token("}").map(|t| t.start()), Some(source.len() - 1));
    }

    #[test]
    fn test_named_nodes_are_not_tokens() {
        let source = r#"{"id": 1}"#;
        let tree = parse(source);
        let root = TreeSitterNode::root(&tree, source);
        let pair = root
            .find_first_non_error_child()
            .and_then(|object| object.find_first_child_of_name("pair"))
            .unwrap();
        let kinds: Vec<(String, bool)> = pair
            .children()
            .iter()
            .map(|c| (c.text_content(), c.is_token()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("\"id\"".to_string(), false),
                (":".to_string(), true),
                ("1".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_error_and_missing_nodes_are_errors() {
        for source in [r#"{"id": 1"#, r#"{"id" 1}"#, r#"[1, , 2]"#] {
            let tree = parse(source);
            let root = TreeSitterNode::root(&tree, source);
            assert!(root.has_error(), "{source}");

            let mut nodes = Vec::new();
            collect(root, &mut nodes);
            let errors: Vec<_> = nodes.iter().filter(|n| n.is_error()).collect();
            assert!(!errors.is_empty(), "{source}");
            for node in errors {
                assert!(node.inner().is_error() || node.inner().is_missing(), "{source}");
            }
            for node in nodes.iter().filter(|n| n.inner().is_missing()) {
                assert!(node.is_error());
                assert_eq!(node.text_content(), "");
            }
        }
    }
}
