use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::models::{VerificationQuery, WebhookPayload};
use crate::security::is_valid_verification;
use crate::state::AppState;
use crate::utils::error::{ApiError, ServiceError};

/// GET /webhook - Meta subscription handshake
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerificationQuery>,
) -> Result<(StatusCode, String), ApiError> {
    let (Some(mode), Some(token), Some(challenge)) =
        (query.mode, query.verify_token, query.challenge)
    else {
        return Err(ApiError::BadRequest(
            "hub.mode, hub.verify_token and hub.challenge are required".to_string(),
        ));
    };

    if !is_valid_verification(&mode, &token, &state.verify_token) {
        return Err(ApiError::Forbidden("Webhook verification failed".to_string()));
    }

    info!("Webhook verified");
    Ok((StatusCode::OK, challenge))
}

/// POST /webhook - inbound messages and status callbacks.
///
/// Answers 200 whenever the payload is authentic, whatever happens
/// downstream, so Meta never redelivers.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if let Some(validator) = &state.signature_validator {
        validator.validate(&headers, &body)?;
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let err = ServiceError::MalformedPayload(e.to_string());
            warn!("{}", err);
            return Ok(StatusCode::OK);
        }
    };

    let Some(message) = payload.first_message() else {
        debug!(
            "Webhook without messages (object={:?}), nothing to do",
            payload.object
        );
        return Ok(StatusCode::OK);
    };

    let start_time = Instant::now();
    info!(
        "Inbound message: from={}, text_len={}",
        message.from,
        message.text.len()
    );

    let reply = state
        .orchestrator
        .handle_message(&message.from, &message.text)
        .await;

    if let Err(e) = state.sender.send_text(&message.from, &reply).await {
        error!("Reply to {} not delivered: {}", message.from, e);
    }

    debug!(
        "Webhook for {} handled in {:?}",
        message.from,
        start_time.elapsed()
    );
    Ok(StatusCode::OK)
}
