//! # melange-server
//!
//! HTTP boundary for identity provisioning and local accounts.

#![warn(clippy::all)]

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Identity provisioning
        .route("/v1/identities", post(api::identities::provision_identity))
        .route(
            "/v1/identities/current",
            get(api::identities::current_identity),
        )
        // Local accounts
        .route("/v1/accounts", post(api::accounts::create_account))
        .route("/v1/accounts/login", post(api::accounts::login))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

/// Build CORS layer with configured allowed origins
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    use axum::http::header::CONTENT_TYPE;

    let mut origins = Vec::with_capacity(allowed_origins.len());
    for origin in allowed_origins {
        if let Ok(header_value) = origin.parse::<HeaderValue>() {
            origins.push(header_value);
        } else {
            tracing::warn!("Invalid CORS origin: {}", origin);
        }
    }

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(origins))
}
