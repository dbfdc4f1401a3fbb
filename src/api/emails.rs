//! Email rendering endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::email::{EmailEventKind, EmailSendEvent};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::template::TokenBag;

/// An email to run through the send or display pipeline
#[derive(Debug, Default, Deserialize)]
pub struct RenderEmailRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub tokens: TokenBag,
    /// Contact data; anything other than an object is treated as absent
    #[serde(default)]
    pub lead: Option<serde_json::Value>,
}

impl RenderEmailRequest {
    fn into_event(self) -> EmailSendEvent {
        let mut builder = EmailSendEvent::builder()
            .content(self.content)
            .plain_text(self.plain_text)
            .subject(self.subject)
            .tokens(self.tokens);

        match self.lead {
            Some(serde_json::Value::Object(lead)) => builder = builder.lead(lead),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => {
                tracing::debug!(lead_type = json_type(&other), "Ignoring non-object lead data");
            }
        }

        builder.build()
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// The email fields after processing
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderEmailResponse {
    pub event_id: Uuid,
    pub kind: EmailEventKind,
    pub content: String,
    pub plain_text: String,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/emails/send - Render an email about to be sent
#[tracing::instrument(name = "http.send_email", skip(state, request))]
pub async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<RenderEmailRequest>,
) -> Result<Json<RenderEmailResponse>> {
    render_email(&state, EmailEventKind::OnSend, request).await
}

/// POST /api/v1/emails/display - Render an email for preview
#[tracing::instrument(name = "http.display_email", skip(state, request))]
pub async fn display_email(
    State(state): State<AppState>,
    Json(request): Json<RenderEmailRequest>,
) -> Result<Json<RenderEmailResponse>> {
    render_email(&state, EmailEventKind::OnDisplay, request).await
}

async fn render_email(
    state: &AppState,
    kind: EmailEventKind,
    request: RenderEmailRequest,
) -> Result<Json<RenderEmailResponse>> {
    let mut event = request.into_event();
    let dispatcher = state.dispatcher.clone();

    // Rendering is CPU-bound; keep it off the async workers
    let event = tokio::task::spawn_blocking(move || {
        dispatcher.dispatch(kind, &mut event);
        event
    })
    .await
    .map_err(|e| AppError::Internal(format!("Email render task failed: {}", e)))?;

    Ok(Json(RenderEmailResponse {
        event_id: event.id(),
        kind,
        content: event.content().to_string(),
        plain_text: event.plain_text().to_string(),
        subject: event.subject().to_string(),
        timestamp: Utc::now(),
    }))
}
