// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! In-memory syntax tree
//!
//! Used by tests and by callers that build trees from a parser other than
//! tree-sitter. `&MockSyntaxNode` implements [`SyntaxNode`].

use crate::node::{ERROR_KIND, SyntaxNode};
use sqlscope_ir::TextInterval;

/// Kind given to keyword leaves created with [`MockSyntaxNode::keyword`]
pub const KEYWORD_KIND: &str = "keyword";

/// Mock syntax node with explicit interval and text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSyntaxNode {
    pub kind: String,
    pub children: Vec<MockSyntaxNode>,
    pub interval: TextInterval,
    pub text: Option<String>,
    pub token: bool,
}

impl MockSyntaxNode {
    /// Create a new inner node
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            children: Vec::new(),
            interval: TextInterval::default(),
            text: None,
            token: false,
        }
    }

    /// Keyword leaf starting at `start`
    pub fn keyword(text: impl Into<String>, start: usize) -> Self {
        Self::token(KEYWORD_KIND, text, start)
    }

    /// Punctuation leaf whose kind is its own text (`,`, `=`, `(`)
    pub fn punct(text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        Self::token(text.clone(), text, start)
    }

    /// Token leaf covering `text` from `start`
    pub fn token(kind: impl Into<String>, text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.len();
        Self {
            kind: kind.into(),
            children: Vec::new(),
            interval: TextInterval::new(start, end),
            text: Some(text),
            token: true,
        }
    }

    /// Named leaf (identifier, literal) covering `text` from `start`
    pub fn leaf(kind: impl Into<String>, text: impl Into<String>, start: usize) -> Self {
        Self {
            token: false,
            ..Self::token(kind, text, start)
        }
    }

    /// Parser error node
    pub fn error() -> Self {
        Self::new(ERROR_KIND)
    }

    /// Add a child node
    pub fn with_child(mut self, child: MockSyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    /// Add several children
    pub fn with_children(mut self, children: impl IntoIterator<Item = MockSyntaxNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Set the byte range
    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.interval = TextInterval::new(start, end);
        self
    }

    /// Set the range to cover all children
    pub fn fit_to_children(mut self) -> Self {
        if let (Some(first), Some(last)) = (self.children.first(), self.children.last()) {
            self.interval = TextInterval::new(first.interval.start, last.interval.end);
        }
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Depth-first search for the first node of a kind, including `self`
    pub fn find_descendant(&self, kind: &str) -> Option<&MockSyntaxNode> {
        if self.kind == kind {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_descendant(kind))
    }
}

impl<'a> SyntaxNode for &'a MockSyntaxNode {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn interval(&self) -> TextInterval {
        self.interval
    }

    fn children(&self) -> Vec<Self> {
        self.children.iter().collect()
    }

    fn is_error(&self) -> bool {
        self.kind == ERROR_KIND
    }

    fn is_token(&self) -> bool {
        self.token
    }

    fn text_content(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        // no source attached: rebuild from children, padding gaps with spaces
        let mut out = String::new();
        let mut cursor = self.interval.start;
        for child in &self.children {
            if child.interval.start > cursor && !out.is_empty() {
                out.push_str(&" ".repeat(child.interval.start - cursor));
            }
            out.push_str(&child.text_content());
            cursor = child.interval.end;
        }
        out
    }
}
