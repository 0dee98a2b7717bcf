// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for database schema information
//!
//! Tables, columns and functions as reported by a catalog. Pass 2 turns them
//! into typed column bindings; pass 1 never needs them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL data types (unified across dialects)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DataType {
    // Numeric types
    Integer,
    BigInt,
    SmallInt,
    Decimal,
    Float,
    Double,

    // String types
    Varchar(Option<usize>),
    Char(Option<usize>),
    Text,

    // Date/Time types
    Date,
    Time,
    Timestamp,

    Boolean,
    Json,
    Uuid,
    Null,

    // Unknown/Other (with original type name)
    Other(String),
}

impl DataType {
    /// Type of a literal token, inferred from its text
    pub fn of_literal(text: &str) -> DataType {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            DataType::Null
        } else if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            DataType::Boolean
        } else if text.starts_with('\'') {
            DataType::Text
        } else if text.parse::<i64>().is_ok() {
            DataType::Integer
        } else if text.parse::<f64>().is_ok() {
            DataType::Decimal
        } else {
            DataType::Other(text.to_string())
        }
    }

    /// Parse a SQL type name such as `varchar(255)` or `BIGINT`
    pub fn from_sql_name(name: &str) -> DataType {
        let name = name.trim().to_ascii_lowercase();
        let (base, size) = match name.split_once('(') {
            Some((base, rest)) => (
                base.trim().to_string(),
                rest.trim_end_matches(')').trim().parse::<usize>().ok(),
            ),
            None => (name.clone(), None),
        };
        match base.as_str() {
            "int" | "integer" | "int4" => DataType::Integer,
            "bigint" | "int8" => DataType::BigInt,
            "smallint" | "int2" => DataType::SmallInt,
            "decimal" | "numeric" => DataType::Decimal,
            "float" | "real" | "float4" => DataType::Float,
            "double" | "double precision" | "float8" => DataType::Double,
            "varchar" | "character varying" => DataType::Varchar(size),
            "char" | "character" => DataType::Char(size),
            "text" => DataType::Text,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "timestamp" | "datetime" | "timestamptz" => DataType::Timestamp,
            "bool" | "boolean" => DataType::Boolean,
            "json" | "jsonb" => DataType::Json,
            "uuid" => DataType::Uuid,
            _ => DataType::Other(name),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer
                | DataType::BigInt
                | DataType::SmallInt
                | DataType::Decimal
                | DataType::Float
                | DataType::Double
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::BigInt => f.write_str("BIGINT"),
            DataType::SmallInt => f.write_str("SMALLINT"),
            DataType::Decimal => f.write_str("DECIMAL"),
            DataType::Float => f.write_str("FLOAT"),
            DataType::Double => f.write_str("DOUBLE"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            DataType::Varchar(None) => f.write_str("VARCHAR"),
            DataType::Char(Some(n)) => write!(f, "CHAR({n})"),
            DataType::Char(None) => f.write_str("CHAR"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Date => f.write_str("DATE"),
            DataType::Time => f.write_str("TIME"),
            DataType::Timestamp => f.write_str("TIMESTAMP"),
            DataType::Boolean => f.write_str("BOOLEAN"),
            DataType::Json => f.write_str("JSON"),
            DataType::Uuid => f.write_str("UUID"),
            DataType::Null => f.write_str("NULL"),
            DataType::Other(name) => f.write_str(name),
        }
    }
}

/// Table type classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableType {
    #[default]
    Table,
    View,
    MaterializedView,
    Temporary,
    Other(String),
}

/// Metadata for a database column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            is_primary_key: false,
        }
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Builder method: mark as primary key
    pub fn with_primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// Metadata for a database table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub schema: String,
    pub columns: Vec<ColumnMetadata>,
    pub table_type: TableType,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns: Vec::new(),
            table_type: TableType::Table,
        }
    }

    /// Builder method: add columns
    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: set table type
    pub fn with_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Get column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Function classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    Scalar,
    Aggregate,
    Window,
    Table,
}

/// Metadata for a database function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    pub name: String,
    pub return_type: DataType,
    pub function_type: FunctionType,
}

impl FunctionMetadata {
    pub fn new(name: impl Into<String>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            return_type,
            function_type: FunctionType::Scalar,
        }
    }

    /// Builder method: set function type
    pub fn with_type(mut self, function_type: FunctionType) -> Self {
        self.function_type = function_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_types() {
        assert_eq!(DataType::of_literal("42"), DataType::Integer);
        assert_eq!(DataType::of_literal("4.2"), DataType::Decimal);
        assert_eq!(DataType::of_literal("'x'"), DataType::Text);
        assert_eq!(DataType::of_literal("NULL"), DataType::Null);
        assert_eq!(DataType::of_literal("true"), DataType::Boolean);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::from_sql_name("VARCHAR(64)"), DataType::Varchar(Some(64)));
        assert_eq!(DataType::from_sql_name("int"), DataType::Integer);
        assert_eq!(DataType::from_sql_name("jsonb"), DataType::Json);
        assert_eq!(
            DataType::from_sql_name("geometry"),
            DataType::Other("geometry".to_string())
        );
    }

    #[test]
    fn test_table_column_lookup() {
        let table = TableMetadata::new("users", "public").with_columns(vec![
            ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
            ColumnMetadata::new("email", DataType::Varchar(Some(255))).with_nullable(true),
        ]);
        assert!(table.get_column("ID").is_some_and(|c| c.is_primary_key));
        assert!(table.get_column("missing").is_none());
        assert_eq!(table.qualified_name(), "public.users");
        assert_eq!(table.columns[1].data_type.to_string(), "VARCHAR(255)");
    }
}
