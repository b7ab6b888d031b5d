use crate::utils::error::ApiError;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks `X-Hub-Signature-256: sha256=<hex>` against the raw request body
#[derive(Debug, Clone)]
pub struct WebhookSignatureValidator {
    app_secret: String,
}

impl WebhookSignatureValidator {
    pub fn new(app_secret: String) -> Self {
        Self { app_secret }
    }

    pub fn validate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", SIGNATURE_HEADER)))?;

        let provided = header
            .strip_prefix("sha256=")
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or_else(|| ApiError::Unauthorized("Malformed webhook signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| ApiError::InternalError(format!("HMAC error: {}", e)))?;
        mac.update(body);

        // constant-time comparison
        if mac.verify_slice(&provided).is_err() {
            warn!("Webhook signature mismatch");
            return Err(ApiError::Unauthorized("Invalid webhook signature".to_string()));
        }

        debug!("Webhook signature verified");
        Ok(())
    }

    /// Signature header value for `body` (tests and local tooling)
    pub fn sign(&self, body: &[u8]) -> Result<String, ApiError> {
        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| ApiError::InternalError(format!("HMAC error: {}", e)))?;
        mac.update(body);
        Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}
