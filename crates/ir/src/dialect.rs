// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect Support
//!
//! The recognizer never consults a global table of grammar rule names. Instead
//! every analysis call receives a [`DialectCapabilities`] record describing:
//!
//! 1. **Rule names**: which syntax-node kinds denote statements, clauses and
//!    expressions ([`RuleNames`])
//! 2. **Identifier rules**: quoting characters and case folding ([`IdentifierRules`])
//! 3. **Clause extensions**: dialect-only clauses such as `UPDATE ... FROM`
//!    ([`ClauseExtension`])
//!
//! ## Dialect Families
//!
//! - **MySQL Family**: MySQL, TiDB, MariaDB
//!   - backtick identifiers, case-insensitive names
//!   - `UPDATE ... ORDER BY ... LIMIT`, `DELETE ... ORDER BY ... LIMIT`
//! - **PostgreSQL Family**: PostgreSQL, CockroachDB
//!   - unquoted identifiers fold to lower case
//!   - `UPDATE ... FROM`, `DELETE ... USING`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL (5.7, 8.0)
    #[serde(alias = "MySQL")]
    MySQL,
    /// PostgreSQL (12, 14, 15+)
    #[default]
    #[serde(alias = "postgres", alias = "PostgreSQL")]
    PostgreSQL,
    /// TiDB
    TiDB,
    /// MariaDB
    MariaDB,
    /// CockroachDB
    CockroachDB,
}

impl Dialect {
    /// Returns the family this dialect belongs to
    pub fn family(&self) -> DialectFamily {
        match self {
            Dialect::MySQL | Dialect::TiDB | Dialect::MariaDB => DialectFamily::MySQL,
            Dialect::PostgreSQL | Dialect::CockroachDB => DialectFamily::PostgreSQL,
        }
    }

    /// Lower-case dialect name
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySQL => "mysql",
            Dialect::PostgreSQL => "postgresql",
            Dialect::TiDB => "tidb",
            Dialect::MariaDB => "mariadb",
            Dialect::CockroachDB => "cockroachdb",
        }
    }

    /// Check if this dialect supports a clause extension
    pub fn supports(&self, ext: ClauseExtension) -> bool {
        match self.family() {
            DialectFamily::MySQL => matches!(
                ext,
                ClauseExtension::UpdateOrderLimit | ClauseExtension::DeleteOrderLimit
            ),
            DialectFamily::PostgreSQL => matches!(
                ext,
                ClauseExtension::UpdateFrom | ClauseExtension::DeleteUsing
            ),
        }
    }

    /// Build the capability record for this dialect with the default rule names
    pub fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities::new(*self)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a dialect name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SQL dialect: {0}")]
pub struct ParseDialectError(pub String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySQL),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSQL),
            "tidb" => Ok(Dialect::TiDB),
            "mariadb" => Ok(Dialect::MariaDB),
            "cockroachdb" | "cockroach" => Ok(Dialect::CockroachDB),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}

/// Dialect family groupings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectFamily {
    MySQL,
    PostgreSQL,
}

/// Clauses that only some dialects accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseExtension {
    /// `UPDATE t SET ... FROM other` (PostgreSQL family)
    UpdateFrom,
    /// `UPDATE t SET ... ORDER BY ... LIMIT n` (MySQL family)
    UpdateOrderLimit,
    /// `DELETE FROM t USING other` (PostgreSQL family)
    DeleteUsing,
    /// `DELETE FROM t ... ORDER BY ... LIMIT n` (MySQL family)
    DeleteOrderLimit,
}

/// Case folding applied to unquoted identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseFolding {
    /// Unquoted names fold to lower case, quoted names are exact (PostgreSQL)
    Lower,
    /// All names compare case-insensitively, quoted or not (MySQL)
    Insensitive,
}

/// Identifier quoting and comparison rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentifierRules {
    /// Opening/closing quote pairs accepted around identifiers
    pub quotes: &'static [(char, char)],
    /// How identifiers are compared
    pub folding: CaseFolding,
}

impl IdentifierRules {
    /// Rules for a dialect family
    pub fn for_family(family: DialectFamily) -> Self {
        match family {
            DialectFamily::MySQL => Self {
                quotes: &[('`', '`'), ('"', '"')],
                folding: CaseFolding::Insensitive,
            },
            DialectFamily::PostgreSQL => Self {
                quotes: &[('"', '"')],
                folding: CaseFolding::Lower,
            },
        }
    }

    /// Returns the quote pair enclosing `raw`, if any
    pub fn quote_pair(&self, raw: &str) -> Option<(char, char)> {
        let mut chars = raw.chars();
        let first = chars.next()?;
        let last = chars.next_back()?;
        self.quotes
            .iter()
            .copied()
            .find(|&(open, close)| open == first && close == last)
    }
}

/// Grammar rule names the recognizers look up
///
/// Each field is the `kind` of a syntax node produced by the external grammar.
/// The defaults follow the tree-sitter SQL grammar rule names; a grammar with other
/// names supplies its own record through [`DialectCapabilities::with_rule_names`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleNames {
    // statements
    pub select_statement: &'static str,
    pub insert_statement: &'static str,
    pub update_statement: &'static str,
    pub delete_statement: &'static str,

    // clauses
    pub select_list: &'static str,
    pub select_item: &'static str,
    pub alias: &'static str,
    pub from_clause: &'static str,
    pub where_clause: &'static str,
    pub group_by_clause: &'static str,
    pub having_clause: &'static str,
    pub order_by_clause: &'static str,
    pub order_by_item: &'static str,
    pub limit_clause: &'static str,
    pub set_operation: &'static str,
    pub set_clause: &'static str,
    pub assignment: &'static str,
    pub column_list: &'static str,
    pub values_clause: &'static str,
    pub row_value: &'static str,
    pub using_clause: &'static str,

    // row sources
    pub table_reference: &'static str,
    pub object_name: &'static str,
    pub derived_table: &'static str,
    pub joined_table: &'static str,
    pub join_condition: &'static str,

    // value expressions
    pub identifier: &'static str,
    pub column_reference: &'static str,
    pub literal: &'static str,
    pub function_call: &'static str,
    pub binary_expression: &'static str,
    pub unary_expression: &'static str,
    pub parenthesized_expression: &'static str,
    pub expression_list: &'static str,
    pub subquery: &'static str,
    pub star: &'static str,

    // error recovery
    pub unexpected: &'static str,
}

impl Default for RuleNames {
    fn default() -> Self {
        Self {
            select_statement: "select_statement",
            insert_statement: "insert_statement",
            update_statement: "update_statement",
            delete_statement: "delete_statement",
            select_list: "select_list",
            select_item: "select_item",
            alias: "alias",
            from_clause: "from_clause",
            where_clause: "where_clause",
            group_by_clause: "group_by_clause",
            having_clause: "having_clause",
            order_by_clause: "order_by_clause",
            order_by_item: "order_by_item",
            limit_clause: "limit_clause",
            set_operation: "set_operation",
            set_clause: "set_clause",
            assignment: "assignment",
            column_list: "column_list",
            values_clause: "values_clause",
            row_value: "row_value",
            using_clause: "using_clause",
            table_reference: "table_reference",
            object_name: "object_name",
            derived_table: "derived_table",
            joined_table: "joined_table",
            join_condition: "join_condition",
            identifier: "identifier",
            column_reference: "column_reference",
            literal: "literal",
            function_call: "function_call",
            binary_expression: "binary_expression",
            unary_expression: "unary_expression",
            parenthesized_expression: "parenthesized_expression",
            expression_list: "expression_list",
            subquery: "subquery",
            star: "star",
            unexpected: "unexpected",
        }
    }
}

impl RuleNames {
    /// Whether `kind` names a row source node
    pub fn is_rows_source(&self, kind: &str) -> bool {
        kind == self.table_reference || kind == self.derived_table || kind == self.joined_table
    }

    /// Whether `kind` names a statement node
    pub fn is_statement(&self, kind: &str) -> bool {
        kind == self.select_statement
            || kind == self.insert_statement
            || kind == self.update_statement
            || kind == self.delete_statement
    }
}

/// Everything the recognizer needs to know about the active dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectCapabilities {
    pub dialect: Dialect,
    pub rule_names: RuleNames,
    pub identifiers: IdentifierRules,
}

impl DialectCapabilities {
    /// Capabilities with the default rule names
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            rule_names: RuleNames::default(),
            identifiers: IdentifierRules::for_family(dialect.family()),
        }
    }

    /// Replace the rule names (for grammars with a different naming scheme)
    pub fn with_rule_names(mut self, rule_names: RuleNames) -> Self {
        self.rule_names = rule_names;
        self
    }

    /// Check if a clause extension is supported
    pub fn supports(&self, ext: ClauseExtension) -> bool {
        self.dialect.supports(ext)
    }
}

impl Default for DialectCapabilities {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}
