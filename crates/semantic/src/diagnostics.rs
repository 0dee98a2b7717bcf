// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Diagnostics and recognition statistics
//!
//! Problems with the SQL text never abort recognition. They are collected
//! here, together with counters describing what the recognizer did, and
//! exposed read-only to validation consumers.

use serde::Serialize;
use sqlscope_ir::TextInterval;
use std::fmt;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// An expected clause or node is missing
    StructuralGap,
    /// A name was not found in any visible context
    UnresolvedSymbol,
    /// The parser flagged a subtree as invalid, or it nests too deeply
    MalformedSubtree,
    /// Recognition stopped early on request
    CancellationRequested,
    /// A clause the active dialect does not accept
    UnsupportedClause,
    /// The catalog could not be queried
    MetadataUnavailable,
}

/// Diagnostic severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Item-local interval, or document interval once collected by a script model
    pub interval: TextInterval,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        interval: TextInterval,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            interval,
            message: message.into(),
        }
    }

    /// Same diagnostic moved by a document offset
    pub fn shifted(&self, by: usize) -> Self {
        Self {
            interval: self.interval.shifted(by),
            ..self.clone()
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.interval, self.message)
    }
}

/// Counters collected while recognizing and resolving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecognitionStatistics {
    pub statements: usize,
    pub scopes: usize,
    pub unresolved_symbols: usize,
    pub malformed_subtrees: usize,
    pub structural_gaps: usize,
    pub cancelled: bool,
}

impl RecognitionStatistics {
    /// Count one diagnostic of `kind`
    pub fn record(&mut self, kind: DiagnosticKind) {
        match kind {
            DiagnosticKind::StructuralGap => self.structural_gaps += 1,
            DiagnosticKind::UnresolvedSymbol => self.unresolved_symbols += 1,
            DiagnosticKind::MalformedSubtree => self.malformed_subtrees += 1,
            DiagnosticKind::CancellationRequested => self.cancelled = true,
            DiagnosticKind::UnsupportedClause | DiagnosticKind::MetadataUnavailable => {}
        }
    }

    /// Add the counters of `other`
    pub fn merge(&mut self, other: &RecognitionStatistics) {
        self.statements += other.statements;
        self.scopes += other.scopes;
        self.unresolved_symbols += other.unresolved_symbols;
        self.malformed_subtrees += other.malformed_subtrees;
        self.structural_gaps += other.structural_gaps;
        self.cancelled |= other.cancelled;
    }
}

/// Levenshtein distance between two names, compared case-insensitively
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Up to three candidates within edit distance 2 of `name`, closest first
pub(crate) fn suggestions<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|c| (edit_distance(name, c), c))
        .filter(|(d, c)| *d > 0 && *d <= 2 && c.len() > 1)
        .collect();
    scored.sort();
    scored.dedup_by(|a, b| a.1.eq_ignore_ascii_case(b.1));
    scored.into_iter().take(3).map(|(_, c)| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_statistics_record_and_merge() {
        let mut a = RecognitionStatistics::default();
        a.record(DiagnosticKind::UnresolvedSymbol);
        a.record(DiagnosticKind::MalformedSubtree);
        let mut b = RecognitionStatistics {
            statements: 2,
            ..Default::default()
        };
        b.record(DiagnosticKind::CancellationRequested);
        a.merge(&b);
        assert_eq!(a.unresolved_symbols, 1);
        assert_eq!(a.malformed_subtrees, 1);
        assert_eq!(a.statements, 2);
        assert!(a.cancelled);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("Email", "email"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_suggestions() {
        let names = ["email", "name", "id", "created_at"];
        assert_eq!(suggestions("emial", names), vec!["email".to_string()]);
        assert!(suggestions("zzzzzz", names).is_empty());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(
            DiagnosticKind::UnresolvedSymbol,
            Severity::Warning,
            TextInterval::new(3, 7),
            "Column not found: x",
        );
        assert_eq!(d.to_string(), "warning [3, 7): Column not found: x");
        assert_eq!(d.shifted(10).interval, TextInterval::new(13, 17));
    }
}
