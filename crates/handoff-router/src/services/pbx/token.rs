use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::PbxApi;
use crate::utils::clock::Clock;
use crate::utils::error::ServiceError;

/// Cached PBX bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    /// Remote expiry minus the safety margin
    pub expires_at_epoch_seconds: i64,
}

impl Credential {
    fn is_usable(&self, now: i64) -> bool {
        now < self.expires_at_epoch_seconds
    }
}

type Renewal = Shared<BoxFuture<'static, Result<Credential, ServiceError>>>;

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    /// Renewal in flight; every caller that finds no usable credential awaits it
    renewal: Option<Renewal>,
}

/// Owns the PBX credential and renews it on demand.
///
/// Overlapping callers share one renewal request and all see its result,
/// success or failure. The state lock is never held across the request.
pub struct TokenManager {
    api: Arc<dyn PbxApi>,
    username: Arc<str>,
    password: Arc<str>,
    safety_margin_seconds: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(
        api: Arc<dyn PbxApi>,
        username: String,
        password: String,
        safety_margin_seconds: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            username: username.into(),
            password: password.into(),
            safety_margin_seconds: safety_margin_seconds.max(0),
            clock,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Valid token, renewing when absent or at/after expiry
    pub async fn get_token(&self) -> Result<String, ServiceError> {
        let renewal = {
            let mut state = self.state.lock().await;

            let now = self.clock.now_epoch_seconds();
            if let Some(credential) = state.credential.as_ref().filter(|c| c.is_usable(now)) {
                return Ok(credential.token.clone());
            }

            match &state.renewal {
                Some(in_flight) => {
                    debug!("Joining PBX token renewal in flight");
                    in_flight.clone()
                }
                None => {
                    debug!("PBX token missing or expired, renewing");
                    let renewal = self.renewal();
                    state.renewal = Some(renewal.clone());
                    renewal
                }
            }
        };

        let result = renewal.clone().await;

        let mut state = self.state.lock().await;
        // first caller back retires the renewal; later ones find it gone
        if state
            .renewal
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&renewal))
        {
            state.renewal = None;
            if let Ok(credential) = &result {
                state.credential = Some(credential.clone());
            }
        }

        result.map(|credential| credential.token)
    }

    fn renewal(&self) -> Renewal {
        let api = self.api.clone();
        let username = self.username.clone();
        let password = self.password.clone();
        let clock = self.clock.clone();
        let margin = self.safety_margin_seconds;

        async move {
            let issued = api.fetch_token(&username, &password).await.map_err(|e| {
                warn!("PBX token renewal failed: {}", e);
                match e {
                    ServiceError::Auth(_) => e,
                    other => ServiceError::Auth(other.to_string()),
                }
            })?;

            let credential = Credential {
                token: issued.access_token,
                expires_at_epoch_seconds: clock.now_epoch_seconds() + issued.ttl_seconds - margin,
            };

            if issued.ttl_seconds <= margin {
                warn!(
                    "PBX token ttl {}s is within the {}s safety margin; it will renew on every call",
                    issued.ttl_seconds, margin
                );
            } else {
                info!(
                    "PBX token renewed, usable until epoch {}",
                    credential.expires_at_epoch_seconds
                );
            }
            Ok(credential)
        }
        .boxed()
        .shared()
    }

    /// Snapshot of the cached credential
    pub async fn cached(&self) -> Option<Credential> {
        self.state.lock().await.credential.clone()
    }
}
