use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::services::ConversationStore;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    tracked_conversations: usize,
    conversations_by_state: BTreeMap<&'static str, usize>,
}

pub async fn health_check(
    State(store): State<ConversationStore>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_conversations: store.len(),
            conversations_by_state: store.state_counts(),
        }),
    )
}

pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
