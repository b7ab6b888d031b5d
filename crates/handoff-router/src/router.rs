use axum::{routing::get, Router};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Meta webhook (verification + deliveries share the path)
    let webhook_routes = Router::new().route(
        "/webhook",
        get(handlers::webhook::verify_webhook).post(handlers::webhook::receive_webhook),
    );

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .with_state(state)
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
