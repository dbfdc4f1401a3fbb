use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::emails::{display_email, send_email};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::templates::validate_template;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Email rendering
                .route("/emails/send", post(send_email))
                .route("/emails/display", post(display_email))
                // Template tooling
                .route("/templates/validate", post(validate_template))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
