//! API layer - HTTP endpoint handlers organized by domain.

mod emails;
mod health;
mod metrics;
mod routes;
mod templates;

pub use emails::{display_email, send_email, RenderEmailRequest, RenderEmailResponse};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use templates::{validate_template, ValidateTemplateRequest, ValidateTemplateResponse};
