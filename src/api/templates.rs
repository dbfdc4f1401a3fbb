//! Template tooling endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::template::{repair_markup, ContactBag, RenderFailure, TemplateContext, TokenBag};

/// A template to check against the strict engine
#[derive(Debug, Deserialize)]
pub struct ValidateTemplateRequest {
    pub source: String,
    #[serde(default)]
    pub tokens: TokenBag,
    #[serde(default)]
    pub lead: Option<ContactBag>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTemplateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorInfo {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl From<RenderFailure> for ValidationErrorInfo {
    fn from(failure: RenderFailure) -> Self {
        Self {
            kind: failure.kind,
            message: failure.message,
            line: failure.line,
        }
    }
}

/// POST /api/v1/templates/validate - Render with the strict engine.
///
/// Unlike email rendering, undefined variables are reported as errors, which
/// catches misspelled token and contact field names before a send.
#[tracing::instrument(name = "http.validate_template", skip(state, request))]
pub async fn validate_template(
    State(state): State<AppState>,
    Json(request): Json<ValidateTemplateRequest>,
) -> Result<Json<ValidateTemplateResponse>> {
    if request.source.trim().is_empty() {
        return Err(AppError::Validation("source must not be empty".to_string()));
    }

    let repaired = repair_markup(&request.source);
    let lead = request.lead.unwrap_or_default();
    let ctx = TemplateContext::build(&request.tokens, &lead);

    let response = match state.engines.strict.render("validate", &repaired, &ctx) {
        Ok(rendered) => ValidateTemplateResponse {
            valid: true,
            rendered: Some(rendered),
            error: None,
        },
        Err(err) => ValidateTemplateResponse {
            valid: false,
            rendered: None,
            error: Some(RenderFailure::from(&err).into()),
        },
    };

    Ok(Json(response))
}
