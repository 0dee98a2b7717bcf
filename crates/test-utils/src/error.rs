// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Fixture errors

use thiserror::Error;

pub type FixtureResult<T> = Result<T, FixtureError>;

/// Errors raised while reading test fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("Unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("No statement in input")]
    EmptyInput,

    #[error("Input continues after the statement at offset {offset}")]
    TrailingInput { offset: usize },

    #[error("Fixture {0:?} has no cursor marker")]
    MissingCursor(String),

    #[error("Invalid fixture file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FixtureError::UnexpectedCharacter { ch: '#', offset: 7 };
        assert_eq!(err.to_string(), "Unexpected character '#' at offset 7");

        let err = FixtureError::MissingCursor("select list".to_string());
        assert!(err.to_string().contains("select list"));
    }
}
