// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod email;
pub mod template;

// Application layer
pub mod api;
pub mod server;
