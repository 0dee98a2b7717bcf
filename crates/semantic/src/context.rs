// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Recognition context
//!
//! Per-call bundle threaded through recognition and both resolution passes:
//! dialect capabilities, the optional execution context (catalog plus the
//! metadata cache), the strictness flag, a cancellation token and the
//! diagnostics sink.

use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, RecognitionStatistics, Severity};
use sqlscope_catalog::{Catalog, MetadataCache};
use sqlscope_ir::{
    ClauseExtension, DialectCapabilities, Identifier, IdentifierRules, QualifiedName, RuleNames,
    TextInterval,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Live metadata access
///
/// The catalog is only queried by the async analyzer; recognizers read the
/// cache synchronously. Clones share one cache snapshot.
#[derive(Clone)]
pub struct ExecutionContext {
    pub catalog: Arc<dyn Catalog>,
    pub cache: Arc<MetadataCache>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            cache: Arc::new(MetadataCache::new()),
        }
    }

    /// Builder method: use a pre-filled cache
    pub fn with_cache(mut self, cache: MetadataCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Writable cache, copied first if another context shares it
    pub fn cache_mut(&mut self) -> &mut MetadataCache {
        Arc::make_mut(&mut self.cache)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// State of one analysis call
#[derive(Debug)]
pub struct RecognitionContext {
    capabilities: DialectCapabilities,
    execution: Option<ExecutionContext>,
    strict: bool,
    cancellation: CancellationToken,
    diagnostics: Vec<Diagnostic>,
    statistics: RecognitionStatistics,
    depth: usize,
    max_depth: usize,
    table_references: Vec<(QualifiedName, TextInterval)>,
}

impl RecognitionContext {
    pub fn new(capabilities: DialectCapabilities) -> Self {
        Self {
            capabilities,
            execution: None,
            strict: false,
            cancellation: CancellationToken::new(),
            diagnostics: Vec::new(),
            statistics: RecognitionStatistics::default(),
            depth: 0,
            max_depth: crate::config::DEFAULT_MAX_RECURSION_DEPTH,
            table_references: Vec::new(),
        }
    }

    /// Context for the dialect and limits of `config`
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.dialect.capabilities())
            .with_strict(config.strict_validation)
            .with_max_depth(config.max_recursion_depth)
    }

    pub fn with_execution(mut self, execution: ExecutionContext) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Attach live metadata after recognition
    pub fn set_execution(&mut self, execution: Option<ExecutionContext>) {
        self.execution = execution;
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn capabilities(&self) -> &DialectCapabilities {
        &self.capabilities
    }

    pub fn rules(&self) -> &RuleNames {
        &self.capabilities.rule_names
    }

    pub fn identifier_rules(&self) -> &IdentifierRules {
        &self.capabilities.identifiers
    }

    pub fn supports(&self, ext: ClauseExtension) -> bool {
        self.capabilities.supports(ext)
    }

    /// Parse identifier text with the dialect's quoting rules
    pub fn identifier(&self, raw: &str) -> Identifier {
        Identifier::parse(raw, &self.capabilities.identifiers)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn execution(&self) -> Option<&ExecutionContext> {
        self.execution.as_ref()
    }

    /// Cached metadata, when an execution context is present
    pub fn metadata(&self) -> Option<&MetadataCache> {
        self.execution.as_ref().map(|e| e.cache.as_ref())
    }

    /// Record a diagnostic
    ///
    /// Identical diagnostics (same kind, interval and message) are recorded
    /// once, so running a pass again adds nothing.
    pub fn report(&mut self, kind: DiagnosticKind, interval: TextInterval, message: impl Into<String>) {
        let severity = match kind {
            DiagnosticKind::UnresolvedSymbol if self.strict => Severity::Error,
            DiagnosticKind::UnresolvedSymbol
            | DiagnosticKind::MalformedSubtree
            | DiagnosticKind::MetadataUnavailable => Severity::Warning,
            DiagnosticKind::StructuralGap
            | DiagnosticKind::CancellationRequested
            | DiagnosticKind::UnsupportedClause => Severity::Info,
        };
        let diagnostic = Diagnostic::new(kind, severity, interval, message);
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        debug!(kind = ?kind, interval = %interval, message = %diagnostic.message, "Recorded diagnostic");
        self.statistics.record(kind);
        self.diagnostics.push(diagnostic);
    }

    /// Whether cancellation was requested
    ///
    /// The first positive answer records a `CancellationRequested` diagnostic
    /// at `at`.
    pub fn check_cancelled(&mut self, at: usize) -> bool {
        if !self.cancellation.is_cancelled() {
            return false;
        }
        if !self.statistics.cancelled {
            self.report(
                DiagnosticKind::CancellationRequested,
                TextInterval::new(at, at),
                "Analysis cancelled; model is partial",
            );
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Enter a nested subquery or expression
    ///
    /// Returns `false` (and records a `MalformedSubtree`) when the nesting
    /// limit is reached; the caller must then not descend and must not call
    /// [`exit_nested`](Self::exit_nested).
    pub fn enter_nested(&mut self, interval: TextInterval) -> bool {
        if self.depth >= self.max_depth {
            self.report(
                DiagnosticKind::MalformedSubtree,
                interval,
                format!("Nesting exceeds the limit of {}", self.max_depth),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn exit_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Remember a table reference for the metadata prefetch
    pub fn note_table_reference(&mut self, name: &QualifiedName, interval: TextInterval) {
        if !self.table_references.iter().any(|(n, i)| n == name && *i == interval) {
            self.table_references.push((name.clone(), interval));
        }
    }

    pub fn table_references(&self) -> &[(QualifiedName, TextInterval)] {
        &self.table_references
    }

    pub fn take_table_references(&mut self) -> Vec<(QualifiedName, TextInterval)> {
        std::mem::take(&mut self.table_references)
    }

    pub fn statistics(&self) -> &RecognitionStatistics {
        &self.statistics
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut RecognitionStatistics {
        &mut self.statistics
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
