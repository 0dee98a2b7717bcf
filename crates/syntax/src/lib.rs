// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlscope syntax adapter
//!
//! A thin, read-only view over an external parse tree. The semantic model
//! builder works on any [`SyntaxNode`]; two implementations are provided:
//!
//! - [`TreeSitterNode`] for trees produced by a tree-sitter SQL grammar
//! - `&`[`MockSyntaxNode`] for in-memory trees (tests, other parsers)
//!
//! ## Example
//!
//! ```
//! use sqlscope_syntax::{MockSyntaxNode, SyntaxNode, introducing_keyword_end};
//!
//! let clause = MockSyntaxNode::new("where_clause")
//!     .with_child(MockSyntaxNode::keyword("WHERE", 10))
//!     .with_child(MockSyntaxNode::leaf("literal", "1", 16))
//!     .fit_to_children();
//!
//! assert_eq!((&clause).interval().start, 10);
//! assert_eq!(introducing_keyword_end(&&clause), Some(15));
//! ```

pub mod clause;
pub mod mock;
pub mod node;
pub mod tree_sitter_node;

pub use clause::{
    introducing_keyword_end, is_keyword_token, leading_keywords, separator_offsets, token_end,
};
pub use mock::{KEYWORD_KIND, MockSyntaxNode};
pub use node::{ERROR_KIND, SyntaxNode};
pub use tree_sitter_node::TreeSitterNode;
