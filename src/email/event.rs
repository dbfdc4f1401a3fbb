use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::template::{ContactBag, TokenBag};

/// When in the host's pipeline an email event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailEventKind {
    /// The email is about to be sent
    OnSend,
    /// The email is being rendered for preview/display
    OnDisplay,
}

impl EmailEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailEventKind::OnSend => "send",
            EmailEventKind::OnDisplay => "display",
        }
    }
}

/// Mutable content fields of an outbound email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailField {
    /// HTML body
    Content,
    /// Plain-text alternative
    PlainText,
    Subject,
}

impl EmailField {
    pub const ALL: [EmailField; 3] = [EmailField::Content, EmailField::PlainText, EmailField::Subject];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailField::Content => "content",
            EmailField::PlainText => "plain_text",
            EmailField::Subject => "subject",
        }
    }
}

/// An outbound email passing through the send/display pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSendEvent {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    content: String,
    plain_text: String,
    subject: String,
    tokens: TokenBag,
    #[serde(skip_serializing_if = "Option::is_none")]
    lead: Option<ContactBag>,
}

impl EmailSendEvent {
    pub fn builder() -> EmailEventBuilder {
        EmailEventBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn set_plain_text(&mut self, plain_text: impl Into<String>) {
        self.plain_text = plain_text.into();
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn tokens(&self) -> &TokenBag {
        &self.tokens
    }

    /// Contact data, if the email has a recipient record
    pub fn lead(&self) -> Option<&ContactBag> {
        self.lead.as_ref()
    }

    pub fn field(&self, field: EmailField) -> &str {
        match field {
            EmailField::Content => &self.content,
            EmailField::PlainText => &self.plain_text,
            EmailField::Subject => &self.subject,
        }
    }

    pub fn set_field(&mut self, field: EmailField, value: impl Into<String>) {
        match field {
            EmailField::Content => self.set_content(value),
            EmailField::PlainText => self.set_plain_text(value),
            EmailField::Subject => self.set_subject(value),
        }
    }
}

/// Builder for creating email events
#[derive(Debug, Clone, Default)]
pub struct EmailEventBuilder {
    content: String,
    plain_text: String,
    subject: String,
    tokens: TokenBag,
    lead: Option<ContactBag>,
}

impl EmailEventBuilder {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn plain_text(mut self, plain_text: impl Into<String>) -> Self {
        self.plain_text = plain_text.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn tokens(mut self, tokens: TokenBag) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn lead(mut self, lead: ContactBag) -> Self {
        self.lead = Some(lead);
        self
    }

    pub fn build(self) -> EmailSendEvent {
        EmailSendEvent {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            content: self.content,
            plain_text: self.plain_text,
            subject: self.subject,
            tokens: self.tokens,
            lead: self.lead,
        }
    }
}
