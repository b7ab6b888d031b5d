use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::PbxConfig;
use crate::models::pbx::{
    IssuedToken, SessionListResponse, TokenRequest, TokenResponse, TransferRequest,
    TransferResponse,
};
use crate::utils::error::ServiceError;

const TOKEN_PATH: &str = "/openapi/v1.0/get_token";
const SESSION_LIST_PATH: &str = "/openapi/v1.0/message_session/list";
const SESSION_TRANSFER_PATH: &str = "/openapi/v1.0/message_session/transfer";

/// Remote capabilities of the PBX OpenAPI
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PbxApi: Send + Sync {
    /// Exchange account credentials for an access token
    async fn fetch_token(&self, username: &str, password: &str)
        -> Result<IssuedToken, ServiceError>;

    /// List message sessions belonging to `user_id`
    async fn list_sessions(
        &self,
        access_token: &str,
        user_type: &str,
        user_id: &str,
    ) -> Result<SessionListResponse, ServiceError>;

    async fn transfer_session(
        &self,
        access_token: &str,
        request: &TransferRequest,
    ) -> Result<TransferResponse, ServiceError>;
}

/// reqwest implementation of [`PbxApi`]
#[derive(Clone)]
pub struct PbxClient {
    client: Client,
    base_url: String,
}

impl PbxClient {
    pub fn new(config: &PbxConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
                // the OpenAPI gateway rejects requests without this agent
                .user_agent("OpenAPI")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PbxApi for PbxClient {
    async fn fetch_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, ServiceError> {
        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .json(&TokenRequest { username, password })
            .send()
            .await
            .map_err(|e| ServiceError::Auth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Auth(format!("invalid token response: {}", e)))?;

        if body.errcode != 0 {
            return Err(ServiceError::Auth(format!(
                "errcode={} errmsg={}",
                body.errcode,
                body.errmsg.unwrap_or_default()
            )));
        }

        match (body.access_token, body.access_token_expire_time) {
            (Some(access_token), Some(ttl_seconds)) if !access_token.is_empty() => {
                debug!("PBX issued token valid for {}s", ttl_seconds);
                Ok(IssuedToken {
                    access_token,
                    ttl_seconds,
                })
            }
            _ => Err(ServiceError::Auth(
                "token response without access_token".to_string(),
            )),
        }
    }

    async fn list_sessions(
        &self,
        access_token: &str,
        user_type: &str,
        user_id: &str,
    ) -> Result<SessionListResponse, ServiceError> {
        let response = self
            .client
            .get(self.url(SESSION_LIST_PATH))
            .query(&[
                ("access_token", access_token),
                ("user_type", user_type),
                ("user_id", user_id),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::Lookup(format!("session list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::Lookup(format!(
                "session list returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Lookup(format!("invalid session list response: {}", e)))
    }

    async fn transfer_session(
        &self,
        access_token: &str,
        request: &TransferRequest,
    ) -> Result<TransferResponse, ServiceError> {
        let response = self
            .client
            .post(self.url(SESSION_TRANSFER_PATH))
            .query(&[("access_token", access_token)])
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Transfer(format!("transfer request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Transfer(format!(
                "transfer returned {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Transfer(format!("invalid transfer response: {}", e)))
    }
}
