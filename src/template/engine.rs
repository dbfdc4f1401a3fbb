//! Strict and lenient template engines.

use std::sync::{Arc, OnceLock};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use crate::metrics::TemplateMetrics;

use super::capabilities::CapabilitySet;
use super::context::TemplateContext;
use super::types::TemplateResult;

/// How an engine treats undefined variables and escaping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Undefined variables abort rendering; auto-escaping by template name
    Strict,
    /// Undefined variables (and attributes of them) render empty and are
    /// falsy; output is never auto-escaped
    Lenient,
}

/// A configured template engine. Immutable once built.
pub struct TemplateEngine {
    env: Environment<'static>,
    mode: EngineMode,
    capabilities: Vec<&'static str>,
}

impl TemplateEngine {
    /// Build an engine with the given capabilities installed.
    ///
    /// Capabilities that fail to install are logged and skipped.
    pub fn new(mode: EngineMode, capabilities: &CapabilitySet) -> Self {
        let mut env = Environment::new();
        // Text outside tags renders byte-for-byte as authored
        env.set_keep_trailing_newline(true);
        // The newline right after a block tag belongs to the tag
        env.set_trim_blocks(true);
        match mode {
            EngineMode::Strict => env.set_undefined_behavior(UndefinedBehavior::Strict),
            EngineMode::Lenient => {
                env.set_undefined_behavior(UndefinedBehavior::Chainable);
                env.set_auto_escape_callback(|_| AutoEscape::None);
            }
        }

        let (installed, errors) = capabilities.install_into(&mut env);
        for error in &errors {
            tracing::warn!(mode = ?mode, error = %error, "Skipping template capability");
        }
        TemplateMetrics::record_capabilities_skipped(errors.len());
        tracing::debug!(
            mode = ?mode,
            installed = installed.len(),
            skipped = errors.len(),
            "Template engine built"
        );

        Self {
            env,
            mode,
            capabilities: installed,
        }
    }

    pub fn strict(capabilities: &CapabilitySet) -> Self {
        Self::new(EngineMode::Strict, capabilities)
    }

    pub fn lenient(capabilities: &CapabilitySet) -> Self {
        Self::new(EngineMode::Lenient, capabilities)
    }

    /// Process-wide lenient engine with every capability installed.
    ///
    /// Built on first use; concurrent first callers block until the single
    /// construction finishes.
    pub fn shared_lenient() -> Arc<TemplateEngine> {
        static SHARED: OnceLock<Arc<TemplateEngine>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(TemplateEngine::lenient(&CapabilitySet::all())))
            .clone()
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Names of the installed capabilities
    pub fn capabilities(&self) -> &[&'static str] {
        &self.capabilities
    }

    /// Compile `source` as an ad-hoc template and render it
    pub fn render(&self, name: &str, source: &str, ctx: &TemplateContext) -> TemplateResult<String> {
        Ok(self.env.render_named_str(name, source, ctx)?)
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("mode", &self.mode)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// The strict/lenient engine pair, built once at startup and shared
#[derive(Debug, Clone)]
pub struct TemplateEngines {
    pub strict: Arc<TemplateEngine>,
    pub lenient: Arc<TemplateEngine>,
}

impl TemplateEngines {
    pub fn new(capabilities: &CapabilitySet) -> Self {
        Self {
            strict: Arc::new(TemplateEngine::strict(capabilities)),
            lenient: Arc::new(TemplateEngine::lenient(capabilities)),
        }
    }
}

impl Default for TemplateEngines {
    fn default() -> Self {
        Self::new(&CapabilitySet::all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::context::{ContactBag, TokenBag};
    use crate::template::types::TemplateError;

    fn empty_ctx() -> TemplateContext {
        TemplateContext::build(&TokenBag::new(), &ContactBag::new())
    }

    #[test]
    fn test_lenient_renders_undefined_as_empty() {
        let engine = TemplateEngine::lenient(&CapabilitySet::all());
        let out = engine
            .render("t", "Hi {{ missingVar }}{{ lead.nope.deeper }}!", &empty_ctx())
            .unwrap();
        assert_eq!(out, "Hi !");

        let out = engine
            .render("t", "{% if missingVar %}yes{% else %}no{% endif %}", &empty_ctx())
            .unwrap();
        assert_eq!(out, "no");
    }

    #[test]
    fn test_strict_rejects_undefined() {
        let engine = TemplateEngine::strict(&CapabilitySet::all());
        let err = engine
            .render("t", "Hi {{ missingVar }}", &empty_ctx())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn test_lenient_does_not_escape() {
        let engine = TemplateEngine::lenient(&CapabilitySet::all());
        let out = engine
            .render("body.html", "{{ '<b>bold</b>' }}", &empty_ctx())
            .unwrap();
        assert_eq!(out, "<b>bold</b>");
    }

    #[test]
    fn test_newlines_around_block_tags() {
        let engine = TemplateEngine::lenient(&CapabilitySet::all());
        let out = engine
            .render("t", "{% if true %}\nA\n{% endif %}\nB", &empty_ctx())
            .unwrap();
        assert_eq!(out, "A\nB");

        let out = engine.render("t", "Hi {{ 'Ann' }}\n", &empty_ctx()).unwrap();
        assert_eq!(out, "Hi Ann\n");
    }

    #[test]
    fn test_engines_share_capabilities() {
        let engines = TemplateEngines::default();
        assert_eq!(engines.strict.capabilities(), engines.lenient.capabilities());
        assert_eq!(engines.strict.mode(), EngineMode::Strict);
        assert_eq!(engines.lenient.mode(), EngineMode::Lenient);
    }

    #[test]
    fn test_shared_lenient_is_built_once() {
        let first = TemplateEngine::shared_lenient();
        let second = TemplateEngine::shared_lenient();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_engine_without_capabilities_rejects_custom_filter() {
        let engine = TemplateEngine::lenient(&CapabilitySet::empty());
        assert!(engine.capabilities().is_empty());
        assert!(engine
            .render("t", "{{ 1000|number_format }}", &empty_ctx())
            .is_err());
    }
}
