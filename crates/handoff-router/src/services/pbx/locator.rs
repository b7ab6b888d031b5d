use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::PbxApi;
use super::token::TokenManager;

/// Finds the PBX message session that belongs to a channel user.
///
/// Every failure mode (no token, transport fault, non-zero errcode, empty
/// list) reads as "no active session".
pub struct SessionLocator {
    api: Arc<dyn PbxApi>,
    tokens: Arc<TokenManager>,
    user_type: String,
}

impl SessionLocator {
    pub fn new(api: Arc<dyn PbxApi>, tokens: Arc<TokenManager>, user_type: String) -> Self {
        Self {
            api,
            tokens,
            user_type,
        }
    }

    pub async fn find_active_session(&self, user_id: &str) -> Option<i64> {
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Cannot look up session for {}: {}", user_id, e);
                return None;
            }
        };

        let response = match self
            .api
            .list_sessions(&token, &self.user_type, user_id)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Session lookup for {} failed: {}", user_id, e);
                return None;
            }
        };

        if response.errcode != 0 {
            info!(
                "Session list for {} returned errcode={} ({})",
                user_id,
                response.errcode,
                response.errmsg.unwrap_or_default()
            );
            return None;
        }

        let session_id = response.list.first().map(|session| session.id);
        match session_id {
            Some(id) => debug!("Active session for {}: {}", user_id, id),
            None => info!("No active PBX session for {}", user_id),
        }
        session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pbx::{IssuedToken, SessionListResponse, SessionSummary};
    use crate::services::pbx::client::MockPbxApi;
    use crate::utils::clock::SystemClock;
    use crate::utils::error::ServiceError;
    use mockall::predicate::eq;

    fn with_token(api: &mut MockPbxApi) {
        api.expect_fetch_token().returning(|_, _| {
            Ok(IssuedToken {
                access_token: "tok".into(),
                ttl_seconds: 1800,
            })
        });
    }

    fn locator(api: MockPbxApi) -> SessionLocator {
        let api: Arc<dyn PbxApi> = Arc::new(api);
        let tokens = Arc::new(TokenManager::new(
            api.clone(),
            "api".into(),
            "secret".into(),
            60,
            Arc::new(SystemClock),
        ));
        SessionLocator::new(api, tokens, "visitor".into())
    }

    #[tokio::test]
    async fn test_first_listed_session_wins() {
        let mut api = MockPbxApi::new();
        with_token(&mut api);
        api.expect_list_sessions()
            .with(eq("tok"), eq("visitor"), eq("595981"))
            .times(1)
            .returning(|_, _, _| {
                Ok(SessionListResponse {
                    errcode: 0,
                    errmsg: None,
                    list: vec![SessionSummary { id: 5 }, SessionSummary { id: 9 }],
                })
            });

        assert_eq!(locator(api).find_active_session("595981").await, Some(5));
    }

    #[tokio::test]
    async fn test_empty_list_is_none() {
        let mut api = MockPbxApi::new();
        with_token(&mut api);
        api.expect_list_sessions().returning(|_, _, _| {
            Ok(SessionListResponse {
                errcode: 0,
                errmsg: None,
                list: vec![],
            })
        });

        assert_eq!(locator(api).find_active_session("595981").await, None);
    }

    #[tokio::test]
    async fn test_remote_errcode_is_none() {
        let mut api = MockPbxApi::new();
        with_token(&mut api);
        api.expect_list_sessions().returning(|_, _, _| {
            Ok(SessionListResponse {
                errcode: 10002,
                errmsg: Some("FAILURE".into()),
                list: vec![SessionSummary { id: 1 }],
            })
        });

        assert_eq!(locator(api).find_active_session("595981").await, None);
    }

    #[tokio::test]
    async fn test_transport_fault_is_none() {
        let mut api = MockPbxApi::new();
        with_token(&mut api);
        api.expect_list_sessions()
            .times(1)
            .returning(|_, _, _| Err(ServiceError::Lookup("timed out".into())));

        assert_eq!(locator(api).find_active_session("595981").await, None);
    }

    #[tokio::test]
    async fn test_auth_failure_skips_lookup() {
        let mut api = MockPbxApi::new();
        api.expect_fetch_token()
            .returning(|_, _| Err(ServiceError::Auth("errcode=10004".into())));
        api.expect_list_sessions().never();

        assert_eq!(locator(api).find_active_session("595981").await, None);
    }
}
