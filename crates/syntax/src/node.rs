// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Generic syntax node trait
//!
//! This trait abstracts over Tree-sitter nodes (or other parser outputs).
//! It provides a read-only view for the recognizers: node kind, children,
//! half-open text interval and text. Absence is never an error: lookups on a
//! malformed tree return `None` or an empty list.

use sqlscope_ir::TextInterval;
use std::fmt;

/// Kind reported for parser error nodes by mock trees and tree-sitter alike
pub const ERROR_KIND: &str = "ERROR";

/// Read-only view over one node of an external parse tree
///
/// Implementors are cheap handles (`&MockSyntaxNode`, a tree-sitter node
/// plus source text), so children are returned by value.
pub trait SyntaxNode: Clone + fmt::Debug {
    /// Grammar rule name (e.g. "update_statement", "where_clause")
    fn kind(&self) -> &str;

    /// Item-local half-open byte interval `[start, end)`
    fn interval(&self) -> TextInterval;

    /// All direct children, named nodes and tokens alike, in source order
    fn children(&self) -> Vec<Self>;

    /// Whether the parser flagged this node as an error
    fn is_error(&self) -> bool;

    /// Whether this node is a keyword or punctuation leaf
    fn is_token(&self) -> bool;

    /// Source text covered by this node
    fn text_content(&self) -> String;

    fn start(&self) -> usize {
        self.interval().start
    }

    fn end(&self) -> usize {
        self.interval().end
    }

    /// First direct child with the given rule name
    fn find_first_child_of_name(&self, name: &str) -> Option<Self> {
        self.children().into_iter().find(|c| c.kind() == name)
    }

    /// All direct children with the given rule name
    fn find_children_of_name(&self, name: &str) -> Vec<Self> {
        self.children()
            .into_iter()
            .filter(|c| c.kind() == name)
            .collect()
    }

    /// First direct child that is neither an error node nor a token
    fn find_first_non_error_child(&self) -> Option<Self> {
        self.children()
            .into_iter()
            .find(|c| !c.is_error() && !c.is_token())
    }

    /// Direct children that are tokens
    fn tokens(&self) -> Vec<Self> {
        self.children().into_iter().filter(|c| c.is_token()).collect()
    }

    /// First direct child, if it is a token
    fn first_token(&self) -> Option<Self> {
        self.children().into_iter().next().filter(|c| c.is_token())
    }

    /// First direct token whose text equals `text` (ASCII case-insensitive)
    fn find_token(&self, text: &str) -> Option<Self> {
        self.children()
            .into_iter()
            .find(|c| c.is_token() && c.text_content().eq_ignore_ascii_case(text))
    }

    /// Whether this node or any descendant is an error node
    fn has_error(&self) -> bool {
        self.is_error() || self.children().iter().any(|c| c.has_error())
    }
}
