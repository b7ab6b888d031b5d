use std::sync::Arc;
use tracing::{info, warn};

use super::client::PbxApi;
use super::token::TokenManager;
use crate::models::pbx::TransferRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    /// PBX answered with a non-zero errcode
    Rejected { errcode: i64, errmsg: String },
    /// Token or transport failure
    Failed(String),
}

/// Moves a PBX session into a queue. One attempt, no retry.
pub struct SessionTransferClient {
    api: Arc<dyn PbxApi>,
    tokens: Arc<TokenManager>,
}

impl SessionTransferClient {
    pub fn new(api: Arc<dyn PbxApi>, tokens: Arc<TokenManager>) -> Self {
        Self { api, tokens }
    }

    pub async fn transfer(&self, session_id: i64, queue_id: u64) -> TransferOutcome {
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => return TransferOutcome::Failed(e.to_string()),
        };

        let request = TransferRequest::to_queue(session_id, queue_id);
        let outcome = match self.api.transfer_session(&token, &request).await {
            Ok(response) if response.errcode == 0 => TransferOutcome::Transferred,
            Ok(response) => TransferOutcome::Rejected {
                errcode: response.errcode,
                errmsg: response.errmsg.unwrap_or_default(),
            },
            Err(e) => TransferOutcome::Failed(e.to_string()),
        };

        match &outcome {
            TransferOutcome::Transferred => {
                info!("Session {} transferred to queue {}", session_id, queue_id)
            }
            TransferOutcome::Rejected { errcode, errmsg } => warn!(
                "PBX rejected transfer of session {} to queue {}: errcode={} {}",
                session_id, queue_id, errcode, errmsg
            ),
            TransferOutcome::Failed(reason) => warn!(
                "Transfer of session {} to queue {} failed: {}",
                session_id, queue_id, reason
            ),
        }

        outcome
    }
}
