use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::metrics::EventMetrics;
use crate::template::ContentProcessor;

use super::event::{EmailEventKind, EmailSendEvent};
use super::subscriber::{EmailSubscriber, TemplateSubscriber, TokenReplacementSubscriber};

struct Listener {
    kind: EmailEventKind,
    priority: i32,
    subscriber: Arc<dyn EmailSubscriber>,
}

/// Statistics for the email event dispatcher
#[derive(Debug, Default)]
pub struct EventDispatcherStats {
    pub send_events: AtomicU64,
    pub display_events: AtomicU64,
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct EventDispatcherStatsSnapshot {
    pub send_events: u64,
    pub display_events: u64,
}

/// Runs email events through registered subscribers in priority order
#[derive(Default)]
pub struct EmailEventDispatcher {
    listeners: Vec<Listener>,
    stats: EventDispatcherStats,
}

impl EmailEventDispatcher {
    /// Create a dispatcher with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the standard pipeline: optional token replacement followed by
    /// template processing
    pub fn with_template_processing(
        processor: Arc<ContentProcessor>,
        token_replacement: bool,
    ) -> Self {
        let mut dispatcher = Self::new();
        if token_replacement {
            dispatcher.subscribe(Arc::new(TokenReplacementSubscriber::new()));
        }
        dispatcher.subscribe(Arc::new(TemplateSubscriber::new(processor)));
        dispatcher
    }

    /// Register a subscriber for every event kind it asks for.
    ///
    /// Listeners run highest priority first; equal priorities run in
    /// registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EmailSubscriber>) {
        for (kind, priority) in subscriber.subscribed_events() {
            tracing::debug!(
                subscriber = subscriber.name(),
                kind = kind.as_str(),
                priority,
                "Registering email subscriber"
            );
            let position = self
                .listeners
                .iter()
                .position(|l| l.priority < priority)
                .unwrap_or(self.listeners.len());
            self.listeners.insert(
                position,
                Listener {
                    kind,
                    priority,
                    subscriber: subscriber.clone(),
                },
            );
        }
    }

    /// Names of the subscribers for `kind`, in execution order
    pub fn listeners(&self, kind: EmailEventKind) -> Vec<&'static str> {
        self.listeners
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| l.subscriber.name())
            .collect()
    }

    pub fn stats(&self) -> EventDispatcherStatsSnapshot {
        EventDispatcherStatsSnapshot {
            send_events: self.stats.send_events.load(Ordering::Relaxed),
            display_events: self.stats.display_events.load(Ordering::Relaxed),
        }
    }

    /// Dispatch an event to every matching subscriber
    #[tracing::instrument(
        name = "email.dispatch",
        skip(self, kind, event),
        fields(event_id = %event.id(), kind = kind.as_str())
    )]
    pub fn dispatch(&self, kind: EmailEventKind, event: &mut EmailSendEvent) {
        let counter = match kind {
            EmailEventKind::OnSend => &self.stats.send_events,
            EmailEventKind::OnDisplay => &self.stats.display_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        EventMetrics::record_event(kind.as_str());

        for listener in self.listeners.iter().filter(|l| l.kind == kind) {
            listener.subscriber.on_email_event(kind, event);
        }
    }
}
