// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Cursor expectations from `fixtures/scopes.yaml`
//!
//! Every fixture is parsed, analyzed against the standard mock schema, and
//! checked at its cursor marker.

use sqlscope_semantic::{AnalyzerConfig, ScriptItem, SemanticAnalyzer};
use sqlscope_test_utils::{MockCatalogBuilder, init_tracing, load_scope_fixtures, parse_script};
use std::sync::Arc;

const FIXTURES: &str = include_str!("fixtures/scopes.yaml");

#[tokio::test]
async fn test_scope_fixtures() {
    init_tracing();
    let fixtures = load_scope_fixtures(FIXTURES).expect("fixture file");
    assert!(!fixtures.is_empty());

    let mut failures = Vec::new();
    for fixture in &fixtures {
        let (sql, cursor) = fixture.cursor().expect("cursor marker");
        let statements = parse_script(&sql).unwrap_or_else(|e| panic!("{}: {e}", fixture.name));
        let items: Vec<_> = statements
            .iter()
            .map(|s| ScriptItem::new(&s.tree, s.offset, s.text.clone()))
            .collect();

        let catalog = Arc::new(MockCatalogBuilder::new().with_standard_schema().build());
        let mut analyzer =
            SemanticAnalyzer::new(AnalyzerConfig::new(fixture.dialect)).with_catalog(catalog);
        let script = analyzer.analyze_script(&items).await;

        let role = script.scope_at(cursor).map(|s| format!("{:?}", s.role));
        if role != fixture.scope {
            failures.push(format!(
                "{}: expected scope {:?}, got {:?}",
                fixture.name, fixture.scope, role
            ));
        }

        let offered: Vec<String> = script
            .symbols_visible_at(cursor)
            .iter()
            .map(|s| s.name().text.clone())
            .collect();
        for name in &fixture.visible {
            if !offered.contains(name) {
                failures.push(format!("{}: {name} not offered in {offered:?}", fixture.name));
            }
        }
        for name in &fixture.absent {
            if offered.contains(name) {
                failures.push(format!("{}: {name} must not be offered", fixture.name));
            }
        }
    }

    assert!(failures.is_empty(), "fixture failures:\n{}", failures.join("\n"));
}
