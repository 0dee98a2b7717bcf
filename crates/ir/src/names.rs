// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Identifiers and qualified names
//!
//! An [`Identifier`] keeps the text the user typed (without quotes) together
//! with a comparison key derived from the dialect's [`IdentifierRules`].
//! Two identifiers are equal when their keys are equal, so `Users`, `users`
//! and `` `USERS` `` name the same table in MySQL while `"Users"` and `users`
//! differ in PostgreSQL.

use crate::dialect::{CaseFolding, IdentifierRules};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single (possibly quoted) SQL identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier text with surrounding quotes removed
    pub text: String,
    /// Whether the identifier was quoted in the source
    pub quoted: bool,
    /// Comparison key
    key: String,
}

impl Identifier {
    /// Parse raw identifier text according to the dialect rules
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscope_ir::{Dialect, Identifier, DialectFamily, IdentifierRules};
    ///
    /// let rules = IdentifierRules::for_family(DialectFamily::PostgreSQL);
    /// let quoted = Identifier::parse("\"Users\"", &rules);
    /// let plain = Identifier::parse("USERS", &rules);
    ///
    /// assert_eq!(quoted.text, "Users");
    /// assert_eq!(plain.key(), "users");
    /// assert_ne!(quoted, plain);
    /// # let _ = Dialect::PostgreSQL;
    /// ```
    pub fn parse(raw: &str, rules: &IdentifierRules) -> Self {
        let raw = raw.trim();
        match rules.quote_pair(raw) {
            Some((open, close)) => {
                let inner = &raw[open.len_utf8()..raw.len() - close.len_utf8()];
                // doubled closing quotes escape themselves
                let doubled: String = [close, close].iter().collect();
                let text = inner.replace(&doubled, &close.to_string());
                let key = match rules.folding {
                    CaseFolding::Lower => text.clone(),
                    CaseFolding::Insensitive => text.to_lowercase(),
                };
                Self {
                    text,
                    quoted: true,
                    key,
                }
            }
            None => Self {
                text: raw.to_string(),
                quoted: false,
                key: raw.to_lowercase(),
            },
        }
    }

    /// Unquoted identifier compared case-insensitively
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = text.to_lowercase();
        Self {
            text,
            quoted: false,
            key,
        }
    }

    /// Comparison key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Check if this identifier names the same object as `other`
    pub fn matches(&self, other: &Identifier) -> bool {
        self.key == other.key
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Dotted object name such as `schema.table` or `t.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub parts: Vec<Identifier>,
}

impl QualifiedName {
    pub fn new(parts: Vec<Identifier>) -> Self {
        Self { parts }
    }

    /// Single-part name
    pub fn simple(name: Identifier) -> Self {
        Self { parts: vec![name] }
    }

    /// Last part (object name), if any
    pub fn name(&self) -> Option<&Identifier> {
        self.parts.last()
    }

    /// All parts except the last
    pub fn qualifier(&self) -> &[Identifier] {
        match self.parts.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Normalized lookup key (`schema.table` with folded parts)
    pub fn key(&self) -> String {
        self.parts
            .iter()
            .map(Identifier::key)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Check if `other` names this object, allowing `other` to omit leading qualifiers
    ///
    /// `public.users` is matched by `users` and by `public.users`, but not by
    /// `other.users`.
    pub fn matches_suffix(&self, other: &QualifiedName) -> bool {
        if other.parts.is_empty() || other.parts.len() > self.parts.len() {
            return false;
        }
        let offset = self.parts.len() - other.parts.len();
        self.parts[offset..]
            .iter()
            .zip(&other.parts)
            .all(|(a, b)| a.matches(b))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&text)
    }
}
