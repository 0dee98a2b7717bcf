// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for sqlscope
//!
//! This crate provides common testing components including:
//! - Mock catalog implementations
//! - A small SQL parser producing mock syntax trees with real offsets
//! - YAML cursor fixtures
//! - Test log setup

pub mod error;
pub mod mock_catalog;
pub mod scope_fixture;
pub mod sql_parser;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

// Re-exports for convenience
pub use error::{FixtureError, FixtureResult};
pub use mock_catalog::{MockCatalog, MockCatalogBuilder};
pub use scope_fixture::{CURSOR_MARKER, ScopeFixture, load_scope_fixtures, split_cursor};
pub use sql_parser::{ParsedStatement, parse_script, parse_statement};

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
