// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Symbol types for semantic analysis
//!
//! Tables and columns as seen by the data pass: a table source together with
//! the columns it contributes, when the catalog knows them.

use serde::Serialize;
use sqlscope_ir::{ColumnMetadata, DataType, Identifier, QualifiedName, TextInterval};

/// A row source with its columns
///
/// The visible `name` is the alias when one is given, otherwise the table
/// name (e.g. "u" in `FROM users u`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSymbol {
    /// Name usable as a qualifier
    pub name: Option<Identifier>,

    /// Catalog object for table sources, `None` for derived tables
    pub object: Option<QualifiedName>,

    /// Columns available from this source
    pub columns: Vec<ColumnSymbol>,

    /// `false` when the column list could not be determined (name-only)
    pub columns_known: bool,

    /// Query nesting level the source belongs to
    pub level: usize,

    /// Where the source is written
    pub interval: TextInterval,
}

impl TableSymbol {
    /// Create a table symbol with unknown columns
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscope_ir::{Identifier, QualifiedName};
    /// use sqlscope_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new(QualifiedName::simple(Identifier::new("users")));
    /// assert_eq!(table.display_name(), "users");
    /// assert!(!table.columns_known);
    /// ```
    pub fn new(object: QualifiedName) -> Self {
        Self {
            name: object.name().cloned(),
            object: Some(object),
            columns: Vec::new(),
            columns_known: false,
            level: 0,
            interval: TextInterval::default(),
        }
    }

    /// Create a symbol for a derived table
    pub fn derived(alias: Option<Identifier>) -> Self {
        Self {
            name: alias,
            object: None,
            columns: Vec::new(),
            columns_known: false,
            level: 0,
            interval: TextInterval::default(),
        }
    }

    /// Set an alias for this table
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscope_ir::{Identifier, QualifiedName};
    /// use sqlscope_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new(QualifiedName::simple(Identifier::new("users")))
    ///     .with_alias(Identifier::new("u"));
    /// assert_eq!(table.display_name(), "u");
    /// ```
    pub fn with_alias(mut self, alias: Identifier) -> Self {
        self.name = Some(alias);
        for column in &mut self.columns {
            column.table = self.name.clone();
        }
        self
    }

    /// Set the columns for this table and mark them known
    pub fn with_columns(mut self, columns: Vec<ColumnSymbol>) -> Self {
        self.columns = columns
            .into_iter()
            .map(|mut c| {
                c.table = self.name.clone();
                c
            })
            .collect();
        self.columns_known = true;
        self
    }

    /// Set the columns from catalog metadata
    pub fn with_metadata(self, columns: &[ColumnMetadata]) -> Self {
        let columns = columns.iter().map(ColumnSymbol::from_metadata).collect();
        self.with_columns(columns)
    }

    pub fn with_interval(mut self, interval: TextInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// Check if `qualifier` refers to this table
    ///
    /// One part matches the visible name; several parts match the catalog
    /// object of an unaliased table.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscope_ir::{Identifier, QualifiedName};
    /// use sqlscope_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new(QualifiedName::simple(Identifier::new("users")))
    ///     .with_alias(Identifier::new("u"));
    /// assert!(table.matches(&[Identifier::new("U")]));
    /// assert!(!table.matches(&[Identifier::new("users")]));
    /// ```
    pub fn matches(&self, qualifier: &[Identifier]) -> bool {
        match qualifier {
            [] => false,
            [single] => self.name.as_ref().is_some_and(|n| n.matches(single)),
            parts => {
                let unaliased = self.name.as_ref() == self.object.as_ref().and_then(|o| o.name());
                unaliased
                    && self
                        .object
                        .as_ref()
                        .is_some_and(|o| o.matches_suffix(&QualifiedName::new(parts.to_vec())))
            }
        }
    }

    /// Get the display name (alias if present, otherwise the table name)
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("?", |n| n.text.as_str())
    }

    /// Find a column by name
    pub fn find_column(&self, name: &Identifier) -> Option<&ColumnSymbol> {
        self.columns.iter().find(|c| c.name.matches(name))
    }
}

/// A column of a table symbol, also used as the resolved binding of a
/// column reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSymbol {
    /// Column name
    pub name: Identifier,

    /// Data type, `None` when unknown
    pub data_type: Option<DataType>,

    /// Visible name of the table this column belongs to
    pub table: Option<Identifier>,

    /// Whether this column is a primary key
    pub is_primary_key: bool,
}

impl ColumnSymbol {
    /// Create a column symbol
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscope_ir::{DataType, Identifier};
    /// use sqlscope_semantic::ColumnSymbol;
    ///
    /// let column = ColumnSymbol::new("id", DataType::Integer).with_primary_key();
    /// assert_eq!(column.name, Identifier::new("ID"));
    /// assert!(column.is_primary_key);
    /// ```
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Identifier::new(name),
            data_type: Some(data_type),
            table: None,
            is_primary_key: false,
        }
    }

    /// Column of unknown type belonging to `table`
    pub fn untyped(name: Identifier, table: Option<Identifier>) -> Self {
        Self {
            name,
            data_type: None,
            table,
            is_primary_key: false,
        }
    }

    pub fn from_metadata(meta: &ColumnMetadata) -> Self {
        Self {
            name: Identifier::new(meta.name.clone()),
            data_type: Some(meta.data_type.clone()),
            table: None,
            is_primary_key: meta.is_primary_key,
        }
    }

    /// Mark this column as a primary key
    pub fn with_primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}
