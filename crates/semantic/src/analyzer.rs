// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Script analysis
//!
//! [`SemanticAnalyzer::analyze_script`] runs the whole pipeline over the
//! statements of one document:
//!
//! 1. recognize every item and run the structural pass
//! 2. fetch metadata for the referenced tables through the catalog
//! 3. run the data pass against the cached metadata
//!
//! Diagnostics are collected per statement and shifted to document offsets.
//! [`build_model`] is the synchronous entry for a single item.

use crate::config::AnalyzerConfig;
use crate::context::{ExecutionContext, RecognitionContext};
use crate::diagnostics::{Diagnostic, DiagnosticKind, RecognitionStatistics};
use crate::rows_data_context::RowsDataContext;
use crate::rows_source_context::RowsSourceContext;
use crate::scope::{LexicalScope, SymbolOrigin, VisibleSymbol};
use crate::statement::{StatementModel, recognize};
use sqlscope_catalog::{Catalog, MetadataCache};
use sqlscope_syntax::SyntaxNode;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// One statement of a script
#[derive(Debug, Clone)]
pub struct ScriptItem<N> {
    pub syntax: N,
    /// Document offset of the item's first byte
    pub offset: usize,
    pub length: usize,
    /// Item text, terminator included
    pub text: String,
}

impl<N: SyntaxNode> ScriptItem<N> {
    pub fn new(syntax: N, offset: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            syntax,
            offset,
            length: text.len(),
            text,
        }
    }

    /// Whether the item ends with `;`
    pub fn is_terminated(&self) -> bool {
        self.text.trim_end().ends_with(';')
    }
}

/// Analyzed statement placed in its document
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEntry {
    pub offset: usize,
    pub length: usize,
    pub terminated: bool,
    pub model: StatementModel,
}

impl ScriptEntry {
    fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Result of analyzing a script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptModel {
    pub entries: Vec<ScriptEntry>,
    /// Diagnostics of every statement, in document offsets
    pub diagnostics: Vec<Diagnostic>,
    pub statistics: RecognitionStatistics,
}

impl ScriptModel {
    /// Statement responsible for a document offset
    ///
    /// Offsets between items belong to the preceding item when it is
    /// unterminated and ends in an unbounded tail scope.
    pub fn entry_at(&self, offset: usize) -> Option<&ScriptEntry> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.offset <= offset && offset < e.end())
        {
            return Some(entry);
        }
        self.entries
            .iter()
            .rev()
            .find(|e| e.end() <= offset)
            .filter(|e| !e.terminated && e.model.tail_scope().is_some())
    }

    /// Innermost scope at a document offset
    ///
    /// The returned scope's interval is local to its item.
    pub fn scope_at(&self, offset: usize) -> Option<&LexicalScope> {
        let entry = self.entry_at(offset)?;
        entry.model.scope_at(offset - entry.offset)
    }

    /// Symbols offered at a document offset
    pub fn symbols_visible_at(&self, offset: usize) -> Vec<VisibleSymbol> {
        match self.entry_at(offset) {
            Some(entry) => entry.model.symbols_visible_at(offset - entry.offset),
            None => Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.statistics.cancelled
    }
}

/// Recognized statement waiting for the data pass
struct Staged {
    index: usize,
    ctx: RecognitionContext,
    model: StatementModel,
}

/// Builds script models and keeps catalog metadata between calls
pub struct SemanticAnalyzer {
    config: AnalyzerConfig,
    execution: Option<ExecutionContext>,
    cancellation: CancellationToken,
}

impl SemanticAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            execution: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Builder method: resolve tables through `catalog`
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.execution = Some(ExecutionContext::new(catalog).with_cache(self.empty_cache()));
        self
    }

    /// Builder method: stop analysis when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Cached catalog metadata, `None` without a catalog
    pub fn cache(&self) -> Option<&MetadataCache> {
        self.execution.as_ref().map(|execution| execution.cache.as_ref())
    }

    /// Drop cached metadata, e.g. after a schema change
    pub fn clear_cache(&mut self) {
        let empty = self.empty_cache();
        if let Some(execution) = self.execution.as_mut() {
            *execution.cache_mut() = empty;
        }
    }

    fn empty_cache(&self) -> MetadataCache {
        match &self.config.default_schema {
            Some(schema) => MetadataCache::new().with_default_schema(schema.clone()),
            None => MetadataCache::new(),
        }
    }

    fn recognition_context(&self) -> RecognitionContext {
        RecognitionContext::from_config(&self.config).with_cancellation(self.cancellation.clone())
    }

    /// Analyze the statements of one document
    ///
    /// Items must be ordered by offset. Cancellation stops before the next
    /// statement; the returned model then covers the statements seen so far.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn analyze_script<N: SyntaxNode>(&mut self, items: &[ScriptItem<N>]) -> ScriptModel {
        let mut diagnostics = Vec::new();
        let mut statistics = RecognitionStatistics::default();

        let mut staged = Vec::with_capacity(items.len());
        let mut interrupted = None;
        for (index, item) in items.iter().enumerate() {
            let mut ctx = self.recognition_context();
            if ctx.check_cancelled(0) {
                interrupted = Some((item.offset, ctx));
                break;
            }
            let mut model = recognize(&item.syntax, &mut ctx);
            model.resolve_object_and_rows_references(&RowsSourceContext::empty(), &mut ctx);
            staged.push(Staged { index, ctx, model });
        }

        if self.config.prefetch_metadata && !self.cancellation.is_cancelled() {
            if let Some(execution) = self.execution.as_mut() {
                prefetch(execution, &mut staged).await;
            }
        }
        let execution = self.execution.clone();

        let mut entries = Vec::with_capacity(staged.len());
        let mut previous_tail: Option<SymbolOrigin> = None;
        for Staged {
            index,
            mut ctx,
            mut model,
        } in staged
        {
            let item = &items[index];
            ctx.set_execution(execution.clone());
            model.resolve_value_relations(&RowsDataContext::empty(), &mut ctx);
            if model.is_fragment() {
                if let Some(origin) = &previous_tail {
                    model.adopt_tail(origin);
                }
            }

            let terminated = item.is_terminated();
            previous_tail = if terminated {
                None
            } else {
                model.tail_scope().map(|scope| scope.origin.clone())
            };
            diagnostics.extend(ctx.take_diagnostics().iter().map(|d| d.shifted(item.offset)));
            statistics.merge(ctx.statistics());
            entries.push(ScriptEntry {
                offset: item.offset,
                length: item.length,
                terminated,
                model,
            });
        }

        if let Some((offset, mut ctx)) = interrupted {
            diagnostics.extend(ctx.take_diagnostics().iter().map(|d| d.shifted(offset)));
            statistics.merge(ctx.statistics());
        }

        debug!(
            statements = entries.len(),
            diagnostics = diagnostics.len(),
            cancelled = statistics.cancelled,
            "Analyzed script"
        );
        ScriptModel {
            entries,
            diagnostics,
            statistics,
        }
    }
}

/// Fill the cache with the functions and every table referenced so far
///
/// Catalog failures are reported on the statement that referenced the
/// table; the table then stays name-only.
async fn prefetch(execution: &mut ExecutionContext, staged: &mut [Staged]) {
    let catalog = Arc::clone(&execution.catalog);
    let cache = execution.cache_mut();
    if let Err(err) = cache.prefetch_functions(catalog.as_ref()).await {
        warn!(error = %err, "Function metadata unavailable");
        if let Some(first) = staged.first_mut() {
            let at = first.model.interval;
            first.ctx.report(
                DiagnosticKind::MetadataUnavailable,
                at,
                format!("Function metadata unavailable: {err}"),
            );
        }
    }

    for stage in staged.iter_mut() {
        let references = stage.ctx.take_table_references();
        let failures = cache
            .prefetch_tables(catalog.as_ref(), references.iter().map(|(name, _)| name))
            .await;
        for (name, err) in failures {
            let interval = references
                .iter()
                .find(|(referenced, _)| *referenced == name)
                .map(|(_, interval)| *interval)
                .unwrap_or(stage.model.interval);
            stage.ctx.report(
                DiagnosticKind::MetadataUnavailable,
                interval,
                format!("Metadata for {name} unavailable: {err}"),
            );
        }
    }
}

impl fmt::Debug for SemanticAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticAnalyzer")
            .field("config", &self.config)
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}

/// Recognize and resolve one item with whatever metadata `ctx` carries
///
/// Diagnostics stay in `ctx`, in item-local offsets.
pub fn build_model<N: SyntaxNode>(item: &ScriptItem<N>, ctx: &mut RecognitionContext) -> StatementModel {
    let mut model = recognize(&item.syntax, ctx);
    model.resolve_object_and_rows_references(&RowsSourceContext::empty(), ctx);
    model.resolve_value_relations(&RowsDataContext::empty(), ctx);
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeRole;
    use sqlscope_syntax::MockSyntaxNode;

    fn fragment(start: usize, text: &str) -> MockSyntaxNode {
        MockSyntaxNode::new("where_clause")
            .with_child(MockSyntaxNode::keyword(text, start))
            .fit_to_children()
    }

    #[tokio::test]
    async fn test_cancelled_before_first_statement() {
        let token = CancellationToken::new();
        token.cancel();
        let mut analyzer = SemanticAnalyzer::new(AnalyzerConfig::default()).with_cancellation(token);
        let node = fragment(0, "WHERE");
        let items = vec![ScriptItem::new(&node, 10, "WHERE")];

        let script = analyzer.analyze_script(&items).await;
        assert!(script.entries.is_empty());
        assert!(script.is_cancelled());
        assert_eq!(script.diagnostics.len(), 1);
        assert_eq!(script.diagnostics[0].kind, DiagnosticKind::CancellationRequested);
        assert_eq!(script.diagnostics[0].interval.start, 10);
    }

    #[tokio::test]
    async fn test_offsets_after_unterminated_item() {
        let mut analyzer = SemanticAnalyzer::new(AnalyzerConfig::default());
        let first = fragment(0, "WHERE");
        let second = fragment(0, "WHERE");
        let items = vec![
            ScriptItem::new(&first, 0, "WHERE"),
            ScriptItem::new(&second, 20, "WHERE;"),
        ];

        let script = analyzer.analyze_script(&items).await;
        assert_eq!(script.entries.len(), 2);
        assert_eq!(script.statistics.statements, 2);

        // Between the items: the first one is still open
        let between = script.scope_at(12).unwrap();
        assert_eq!(between.role, ScopeRole::Fragment);
        assert_eq!(script.entry_at(12).map(|e| e.offset), Some(0));

        // After the terminated item nothing is open
        assert!(script.entry_at(30).is_none());
        assert!(script.symbols_visible_at(30).is_empty());
    }

    #[test]
    fn test_item_termination() {
        let node = MockSyntaxNode::new("select_statement");
        assert!(ScriptItem::new(&node, 0, "SELECT 1;  \n").is_terminated());
        assert!(!ScriptItem::new(&node, 0, "SELECT 1").is_terminated());
    }
}
