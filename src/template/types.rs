//! Template error and outcome types

use serde::Serialize;
use thiserror::Error;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    Syntax(#[source] minijinja::Error),

    #[error("Template render failed: {0}")]
    Render(#[source] minijinja::Error),

    #[error("Template engine panicked: {0}")]
    Panicked(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::SyntaxError => TemplateError::Syntax(err),
            _ => TemplateError::Render(err),
        }
    }
}

impl TemplateError {
    fn engine_error(&self) -> Option<&minijinja::Error> {
        match self {
            TemplateError::Syntax(e) | TemplateError::Render(e) => Some(e),
            TemplateError::Panicked(_) => None,
        }
    }

    /// Engine error kind, e.g. `syntax error` or `unknown filter`
    pub fn kind(&self) -> String {
        match self.engine_error() {
            Some(e) => e.kind().to_string(),
            None => "panic".to_string(),
        }
    }

    /// Template name the error was raised in, if known
    pub fn template_name(&self) -> Option<&str> {
        self.engine_error().and_then(|e| e.name())
    }

    /// 1-based line in the template source, if known
    pub fn line(&self) -> Option<usize> {
        self.engine_error().and_then(|e| e.line())
    }
}

/// Details of a contained template failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFailure {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl From<&TemplateError> for RenderFailure {
    fn from(err: &TemplateError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            template: err.template_name().map(str::to_string),
            line: err.line(),
        }
    }
}

/// Result of running one piece of content through the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// No template syntax (or processing disabled); content untouched
    Skipped(String),
    /// Rendered output
    Rendered(String),
    /// Rendering failed; `original` is the input exactly as received
    Failed {
        original: String,
        failure: RenderFailure,
    },
}

impl RenderOutcome {
    /// The content to put back into the email field
    pub fn into_content(self) -> String {
        match self {
            RenderOutcome::Skipped(content) | RenderOutcome::Rendered(content) => content,
            RenderOutcome::Failed { original, .. } => original,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RenderOutcome::Failed { .. })
    }

    /// Label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderOutcome::Skipped(_) => "skipped",
            RenderOutcome::Rendered(_) => "rendered",
            RenderOutcome::Failed { .. } => "fallback",
        }
    }
}
