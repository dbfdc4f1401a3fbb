//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::email::EventDispatcherStatsSnapshot;
use crate::server::AppState;
use crate::template::ProcessorStatsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub templating: TemplatingHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct TemplatingHealthResponse {
    pub enabled: bool,
    pub token_replacement: bool,
    pub capabilities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub content: ProcessorStatsSnapshot,
    pub events: EventDispatcherStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        templating: TemplatingHealthResponse {
            enabled: state.processor.is_enabled(),
            token_replacement: state.settings.templating.token_replacement,
            capabilities: state.engines.lenient.capabilities().to_vec(),
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        content: state.processor.stats(),
        events: state.dispatcher.stats(),
    })
}
