// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Analyzer configuration
//!
//! Settings arrive from the editor as JSON:
//!
//! ```json
//! {
//!   "sqlscope": {
//!     "dialect": "mysql",
//!     "strictValidation": true,
//!     "maxRecursionDepth": 32,
//!     "prefetchMetadata": true,
//!     "defaultSchema": "app"
//!   }
//! }
//! ```
//!
//! Every field is optional.

use serde::Deserialize;
use serde_json::Value;
use sqlscope_ir::Dialect;

/// Settings section read by [`AnalyzerConfig::from_settings`]
pub const SETTINGS_SECTION: &str = "sqlscope";

/// Default nesting limit for subqueries and parenthesized expressions
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Configuration for one analysis session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// SQL dialect of the analyzed text
    pub dialect: Dialect,
    /// Report unresolved names as errors instead of warnings
    pub strict_validation: bool,
    /// Maximum nesting of subqueries and expressions
    pub max_recursion_depth: usize,
    /// Fetch table metadata from the catalog before the data pass
    pub prefetch_metadata: bool,
    /// Schema assumed for unqualified table names
    pub default_schema: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            strict_validation: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            prefetch_metadata: true,
            default_schema: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Builder method: set strict validation
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Builder method: set the recursion limit
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Builder method: set the default schema
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Parse the `sqlscope` section of an editor settings payload
    ///
    /// A payload without the section yields the defaults.
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let Some(section) = settings.get(SETTINGS_SECTION) else {
            return Ok(Self::default());
        };
        let config: Self = serde_json::from_value(section.clone())
            .map_err(|e| ConfigError::InvalidSettings(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_recursion_depth == 0 {
            return Err(ConfigError::InvalidRecursionDepth(self.max_recursion_depth));
        }
        if self.default_schema.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyDefaultSchema);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Settings payload does not match the expected shape
    #[error("Invalid sqlscope settings: {0}")]
    InvalidSettings(String),

    /// Recursion limit must allow at least one level
    #[error("maxRecursionDepth must be at least 1, got {0}")]
    InvalidRecursionDepth(usize),

    /// Default schema given but blank
    #[error("defaultSchema must not be empty")]
    EmptyDefaultSchema,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_section() {
        let config = AnalyzerConfig::from_settings(&json!({ "other": {} })).unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.max_recursion_depth, 64);
        assert!(config.prefetch_metadata);
    }

    #[test]
    fn test_parse_settings() {
        let settings = json!({
            "sqlscope": {
                "dialect": "mysql",
                "strictValidation": true,
                "maxRecursionDepth": 8,
                "defaultSchema": "app"
            }
        });
        let config = AnalyzerConfig::from_settings(&settings).unwrap();
        assert_eq!(config.dialect, Dialect::MySQL);
        assert!(config.strict_validation);
        assert_eq!(config.max_recursion_depth, 8);
        assert_eq!(config.default_schema.as_deref(), Some("app"));
        assert!(config.prefetch_metadata);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = json!({ "sqlscope": { "dialect": "oracle" } });
        assert!(matches!(
            AnalyzerConfig::from_settings(&settings),
            Err(ConfigError::InvalidSettings(_))
        ));

        let settings = json!({ "sqlscope": { "maxRecursionDepth": 0 } });
        assert_eq!(
            AnalyzerConfig::from_settings(&settings),
            Err(ConfigError::InvalidRecursionDepth(0))
        );

        let config = AnalyzerConfig::default().with_default_schema("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyDefaultSchema));
    }
}
