use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::Settings;
use crate::security::WebhookSignatureValidator;
use crate::services::{
    ConversationStore, FlowOrchestrator, MessageSender, PbxClient, QueueTargets, SessionLocator,
    SessionTransferClient, TokenManager, WhatsAppSender,
};
use crate::services::pbx::PbxApi;
use crate::utils::clock::SystemClock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FlowOrchestrator>,
    pub sender: Arc<dyn MessageSender>,
    pub store: ConversationStore,
    pub verify_token: Arc<str>,
    /// Present only when an app secret is configured
    pub signature_validator: Option<Arc<WebhookSignatureValidator>>,
}

impl AppState {
    /// Wire the production services from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let pbx: Arc<dyn PbxApi> = Arc::new(PbxClient::new(&settings.pbx));

        let tokens = Arc::new(TokenManager::new(
            pbx.clone(),
            settings.pbx.username.clone(),
            settings.pbx.password.clone(),
            settings.pbx.token_safety_margin_seconds,
            Arc::new(SystemClock),
        ));

        let locator = Arc::new(SessionLocator::new(
            pbx.clone(),
            tokens.clone(),
            settings.pbx.user_type.clone(),
        ));
        let transfers = Arc::new(SessionTransferClient::new(pbx, tokens));

        let store = ConversationStore::new(settings.conversation.max_tracked_users);
        let orchestrator = Arc::new(FlowOrchestrator::new(
            store.clone(),
            QueueTargets::from(&settings.queues),
            locator,
            transfers,
        ));

        Self {
            orchestrator,
            sender: Arc::new(WhatsAppSender::new(&settings.channel)),
            store,
            verify_token: Arc::from(settings.channel.verify_token.as_str()),
            signature_validator: settings
                .app_secret()
                .map(|secret| Arc::new(WebhookSignatureValidator::new(secret.to_string()))),
        }
    }
}

impl FromRef<AppState> for Arc<FlowOrchestrator> {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}

impl FromRef<AppState> for ConversationStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
