//! Outbound email events and the subscribers that rewrite their content.
//!
//! The host fires an [`EmailSendEvent`] when an email is sent
//! ([`EmailEventKind::OnSend`]) or previewed ([`EmailEventKind::OnDisplay`]).
//! The [`EmailEventDispatcher`] hands it to subscribers highest priority
//! first: token replacement fills `{token}` placeholders, then the
//! [`TemplateSubscriber`] renders template syntax in the body, plain-text
//! alternative and subject.

mod dispatcher;
mod event;
mod subscriber;

pub use dispatcher::{EmailEventDispatcher, EventDispatcherStats, EventDispatcherStatsSnapshot};
pub use event::{EmailEventBuilder, EmailEventKind, EmailField, EmailSendEvent};
pub use subscriber::{
    EmailSubscriber, TemplateSubscriber, TokenReplacementSubscriber, TEMPLATE_PRIORITY,
    TOKEN_REPLACEMENT_PRIORITY,
};
