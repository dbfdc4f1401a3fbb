//! Render-time template processing for email content.
//!
//! This module provides:
//! - Syntax detection for `{{ }}`, `{% %}` and `{# #}` blocks
//! - Repair of HTML entities an editor left inside template blocks
//! - Template context construction from API tokens and contact data
//! - Strict and lenient engines built from an explicit capability set
//! - The [`ContentProcessor`], which renders content or falls back to the
//!   original text on any failure
//!
//! # Example
//!
//! ```ignore
//! let processor = ContentProcessor::default();
//!
//! let tokens = json!({"{orderTotal}": "42"});
//! let lead = json!({"firstname": "Ann"});
//!
//! let body = processor.process(
//!     "Hi {{ lead.firstname }}{% if orderTotal &gt; 40 %}, thanks for your order{% endif %}",
//!     tokens.as_object().unwrap(),
//!     lead.as_object().unwrap(),
//! );
//! ```

mod capabilities;
mod context;
mod engine;
mod processor;
mod repair;
mod syntax;
mod types;

pub use capabilities::{Capability, CapabilityError, CapabilityKind, CapabilitySet};
pub use context::{
    normalize_token_key, ContactBag, TemplateContext, TokenBag, CONTACT_KEY, LEAD_KEY, TOKENS_KEY,
};
pub use engine::{EngineMode, TemplateEngine, TemplateEngines};
pub use processor::{ContentProcessor, ProcessorStats, ProcessorStatsSnapshot};
pub use repair::repair_markup;
pub use syntax::has_template_syntax;
pub use types::{RenderFailure, RenderOutcome, TemplateError, TemplateResult};
