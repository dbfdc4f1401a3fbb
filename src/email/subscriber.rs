use std::sync::Arc;

use crate::template::{ContactBag, ContentProcessor};

use super::event::{EmailEventKind, EmailField, EmailSendEvent};

/// Priority of the host's token replacement step
pub const TOKEN_REPLACEMENT_PRIORITY: i32 = 10;

/// Priority of template processing. Lower than token replacement so
/// placeholders already hold their values when templates are evaluated.
pub const TEMPLATE_PRIORITY: i32 = 0;

/// A listener on email send/display events
pub trait EmailSubscriber: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Event kinds this subscriber listens to, with priorities.
    /// Higher priorities run first.
    fn subscribed_events(&self) -> Vec<(EmailEventKind, i32)>;

    /// Handle an event, mutating its fields in place
    fn on_email_event(&self, kind: EmailEventKind, event: &mut EmailSendEvent);
}

/// Runs the body, plain-text alternative and subject of every email
/// through the [`ContentProcessor`].
pub struct TemplateSubscriber {
    processor: Arc<ContentProcessor>,
}

impl TemplateSubscriber {
    pub fn new(processor: Arc<ContentProcessor>) -> Self {
        Self { processor }
    }
}

impl EmailSubscriber for TemplateSubscriber {
    fn name(&self) -> &'static str {
        "template"
    }

    fn subscribed_events(&self) -> Vec<(EmailEventKind, i32)> {
        vec![
            (EmailEventKind::OnSend, TEMPLATE_PRIORITY),
            (EmailEventKind::OnDisplay, TEMPLATE_PRIORITY),
        ]
    }

    #[tracing::instrument(
        name = "email.process_templates",
        skip(self, kind, event),
        fields(event_id = %event.id(), kind = kind.as_str())
    )]
    fn on_email_event(&self, kind: EmailEventKind, event: &mut EmailSendEvent) {
        let no_lead = ContactBag::new();

        for field in EmailField::ALL {
            let value = event.field(field);
            if value.is_empty() {
                continue;
            }
            let processed = self.processor.process_named(
                field.as_str(),
                value,
                event.tokens(),
                event.lead().unwrap_or(&no_lead),
            );
            event.set_field(field, processed);
        }
    }
}

/// Replaces brace-wrapped token placeholders (`{orderTotal}`) with their
/// values, standing in for the host's own token substitution.
///
/// Replacement is plain substring matching, like the host's: `{{orderTotal}}`
/// written without inner spaces contains `{orderTotal}` and becomes `{42}`.
/// Templates should write `{{ orderTotal }}`.
#[derive(Debug, Default)]
pub struct TokenReplacementSubscriber;

impl TokenReplacementSubscriber {
    pub fn new() -> Self {
        Self
    }
}

impl EmailSubscriber for TokenReplacementSubscriber {
    fn name(&self) -> &'static str {
        "token_replacement"
    }

    fn subscribed_events(&self) -> Vec<(EmailEventKind, i32)> {
        vec![
            (EmailEventKind::OnSend, TOKEN_REPLACEMENT_PRIORITY),
            (EmailEventKind::OnDisplay, TOKEN_REPLACEMENT_PRIORITY),
        ]
    }

    fn on_email_event(&self, _kind: EmailEventKind, event: &mut EmailSendEvent) {
        let replacements: Vec<(String, String)> = event
            .tokens()
            .iter()
            .filter(|(key, _)| key.len() > 2 && key.starts_with('{') && key.ends_with('}'))
            .map(|(key, value)| (key.clone(), token_text(value)))
            .collect();
        if replacements.is_empty() {
            return;
        }

        for field in EmailField::ALL {
            let value = event.field(field);
            if !replacements.iter().any(|(key, _)| value.contains(key.as_str())) {
                continue;
            }
            let mut replaced = value.to_string();
            for (key, text) in &replacements {
                replaced = replaced.replace(key.as_str(), text);
            }
            event.set_field(field, replaced);
        }
    }
}

fn token_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}
