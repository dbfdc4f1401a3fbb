//! Content processor: renders template syntax embedded in email content.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::metrics::TemplateMetrics;

use super::context::{ContactBag, TemplateContext, TokenBag};
use super::engine::TemplateEngine;
use super::repair::repair_markup;
use super::syntax::has_template_syntax;
use super::types::{RenderFailure, RenderOutcome, TemplateError};

/// Template name used when the caller does not name the field
const DEFAULT_TEMPLATE_NAME: &str = "email";

/// Counters for processed content
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub total_processed: AtomicU64,
    pub total_rendered: AtomicU64,
    pub total_skipped: AtomicU64,
    pub total_fallback: AtomicU64,
}

impl ProcessorStats {
    pub fn snapshot(&self) -> ProcessorStatsSnapshot {
        ProcessorStatsSnapshot {
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_rendered: self.total_rendered.load(Ordering::Relaxed),
            total_skipped: self.total_skipped.load(Ordering::Relaxed),
            total_fallback: self.total_fallback.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &RenderOutcome) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RenderOutcome::Skipped(_) => &self.total_skipped,
            RenderOutcome::Rendered(_) => &self.total_rendered,
            RenderOutcome::Failed { .. } => &self.total_fallback,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of processor statistics
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorStatsSnapshot {
    pub total_processed: u64,
    pub total_rendered: u64,
    pub total_skipped: u64,
    pub total_fallback: u64,
}

/// Runs email content through the lenient template engine.
///
/// Processing never fails from the caller's point of view: when the
/// template cannot be compiled or rendered the original content is
/// returned unchanged and the failure is logged.
pub struct ContentProcessor {
    engine: Arc<TemplateEngine>,
    enabled: bool,
    stats: ProcessorStats,
}

impl Default for ContentProcessor {
    fn default() -> Self {
        Self::new(TemplateEngine::shared_lenient())
    }
}

impl ContentProcessor {
    /// Create a processor rendering with `engine`
    pub fn new(engine: Arc<TemplateEngine>) -> Self {
        Self {
            engine,
            enabled: true,
            stats: ProcessorStats::default(),
        }
    }

    /// Turn processing on or off; when off all content is passed through
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn stats(&self) -> ProcessorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Process `content`, returning the rendered text or the original
    /// content if rendering fails.
    pub fn process(&self, content: &str, tokens: &TokenBag, lead: &ContactBag) -> String {
        self.process_named(DEFAULT_TEMPLATE_NAME, content, tokens, lead)
    }

    /// Like [`process`](Self::process), naming the template in logs
    pub fn process_named(
        &self,
        name: &str,
        content: &str,
        tokens: &TokenBag,
        lead: &ContactBag,
    ) -> String {
        self.render(name, content, tokens, lead).into_content()
    }

    /// Run the full pipeline and report how it went
    pub fn render(
        &self,
        name: &str,
        content: &str,
        tokens: &TokenBag,
        lead: &ContactBag,
    ) -> RenderOutcome {
        let outcome = self.render_inner(name, content, tokens, lead);
        self.stats.record(&outcome);
        TemplateMetrics::record_outcome(outcome.as_str());
        outcome
    }

    fn render_inner(
        &self,
        name: &str,
        content: &str,
        tokens: &TokenBag,
        lead: &ContactBag,
    ) -> RenderOutcome {
        if !self.enabled || !has_template_syntax(content) {
            return RenderOutcome::Skipped(content.to_string());
        }

        let repaired = repair_markup(content);
        let ctx = TemplateContext::build(tokens, lead);

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.render(name, &repaired, &ctx)
        }))
        .unwrap_or_else(|payload| Err(TemplateError::Panicked(panic_message(&*payload))));
        TemplateMetrics::observe_render(started.elapsed());

        match result {
            Ok(rendered) => RenderOutcome::Rendered(rendered),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    kind = %err.kind(),
                    template = %err.template_name().unwrap_or(name),
                    line = ?err.line(),
                    "Template processing failed, keeping original content"
                );
                RenderOutcome::Failed {
                    original: content.to_string(),
                    failure: RenderFailure::from(&err),
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::capabilities::CapabilitySet;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    fn processor() -> ContentProcessor {
        ContentProcessor::new(Arc::new(TemplateEngine::lenient(&CapabilitySet::all())))
    }

    #[test]
    fn test_plain_text_is_returned_unchanged() {
        let p = processor();
        let content = "Hello {name}, &lt;b&gt; stays encoded";
        let outcome = p.render("t", content, &TokenBag::new(), &ContactBag::new());
        assert_eq!(outcome, RenderOutcome::Skipped(content.to_string()));
    }

    #[test]
    fn test_whitespace_is_returned_unchanged() {
        let p = processor();
        assert_eq!(p.process("  \n ", &TokenBag::new(), &ContactBag::new()), "  \n ");
        assert_eq!(p.process("", &TokenBag::new(), &ContactBag::new()), "");
    }

    #[test]
    fn test_renders_tokens_and_lead() {
        let p = processor();
        let tokens = bag(json!({"{orderTotal}": "42"}));
        let lead = bag(json!({"firstname": "Ann"}));

        let out = p.process(
            "Hi {{ lead.firstname }}, {{ contact.firstname }}: {{ orderTotal }} / {{ tokens.orderTotal }}",
            &tokens,
            &lead,
        );
        assert_eq!(out, "Hi Ann, Ann: 42 / 42");
    }

    #[test]
    fn test_repair_applies_inside_blocks_only() {
        let p = processor();
        let tokens = bag(json!({"x": 2}));
        let out = p.process(
            "Plain &lt;b&gt; text {% if x &gt; 1 %}yes{% endif %}",
            &tokens,
            &ContactBag::new(),
        );
        assert_eq!(out, "Plain &lt;b&gt; text yes");
    }

    #[test]
    fn test_syntax_error_returns_original_pre_repair() {
        let p = processor();
        let content = "{% if total &gt; %}oops";
        let outcome = p.render("body", content, &TokenBag::new(), &ContactBag::new());
        match outcome {
            RenderOutcome::Failed { original, failure } => {
                assert_eq!(original, content);
                assert_eq!(failure.kind, "syntax error");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_runtime_error_returns_original() {
        let p = processor();
        let content = "Total: {{ total }} &amp; {{ 'x'|no_such_filter }}";
        let out = p.process(content, &TokenBag::new(), &ContactBag::new());
        assert_eq!(out, content);
    }

    #[test]
    fn test_undefined_variable_renders_empty() {
        let p = processor();
        let out = p.process("Hello {{ missingVar }}!", &TokenBag::new(), &ContactBag::new());
        assert_eq!(out, "Hello !");
    }

    #[test]
    fn test_output_is_not_escaped() {
        let p = processor();
        let tokens = bag(json!({"{banner}": "<img src=\"x.png\">"}));
        let out = p.process("{{ banner }}", &tokens, &ContactBag::new());
        assert_eq!(out, "<img src=\"x.png\">");
    }

    #[test]
    fn test_trailing_newline_is_kept() {
        let p = processor();
        let out = p.process("Hi {{ 'Ann' }}\n", &TokenBag::new(), &ContactBag::new());
        assert_eq!(out, "Hi Ann\n");

        let out = p.process(
            "Lines:\n{% for n in [1, 2] %}\n- {{ n }}\n{% endfor %}\nBye\n\n",
            &TokenBag::new(),
            &ContactBag::new(),
        );
        assert_eq!(out, "Lines:\n- 1\n- 2\nBye\n\n");
    }

    #[test]
    fn test_numeric_string_token_formats() {
        let p = processor();
        let tokens = bag(json!({"{orderTotal}": "1234.5"}));
        let out = p.process(
            "Total {{ orderTotal|number_format(2) }}",
            &tokens,
            &ContactBag::new(),
        );
        assert_eq!(out, "Total 1,234.50");
    }

    #[test]
    fn test_disabled_processor_passes_through() {
        let p = processor().with_enabled(false);
        let out = p.process("{{ 1 + 1 }}", &TokenBag::new(), &ContactBag::new());
        assert_eq!(out, "{{ 1 + 1 }}");
    }

    #[test]
    fn test_loops_and_filters() {
        let p = processor();
        let tokens = bag(json!({"{items}": ["a", "b"], "{total}": 1234.5}));
        let out = p.process(
            "{% for item in items %}{{ item|upper }}{% endfor %} {{ total|number_format(2) }}",
            &tokens,
            &ContactBag::new(),
        );
        assert_eq!(out, "AB 1,234.50");
    }

    #[test]
    fn test_stats_track_outcomes() {
        let p = processor();
        p.process("plain", &TokenBag::new(), &ContactBag::new());
        p.process("{{ 1 }}", &TokenBag::new(), &ContactBag::new());
        p.process("{% if %}", &TokenBag::new(), &ContactBag::new());

        let stats = p.stats();
        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.total_skipped, 1);
        assert_eq!(stats.total_rendered, 1);
        assert_eq!(stats.total_fallback, 1);
    }
}
