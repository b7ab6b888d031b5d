use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use super::conversation::{
    transition, ConversationState, ConversationStore, QueueKey, QueueTargets, TransferDirective,
};
use super::pbx::{SessionLocator, SessionTransferClient, TransferOutcome};

/// What happened on the PBX side for one escalation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationReport {
    NoActiveSession {
        queue_id: u64,
    },
    Attempted {
        session_id: i64,
        queue_id: u64,
        outcome: TransferOutcome,
    },
}

#[derive(Debug)]
pub struct FlowOutcome {
    pub reply: String,
    pub previous: ConversationState,
    pub next: ConversationState,
    /// Background PBX handoff, present when the menu asked for one.
    /// Dropping the handle leaves the task running.
    pub escalation: Option<JoinHandle<EscalationReport>>,
}

/// Drives one inbound message through the menu and, when the menu says so,
/// hands the PBX session to a queue.
///
/// The state advance is stored before the PBX is touched, and the PBX work
/// runs on its own task, so the reply never waits for it. PBX failures are
/// logged and never affect the reply.
pub struct FlowOrchestrator {
    store: ConversationStore,
    queues: QueueTargets,
    locator: Arc<SessionLocator>,
    transfers: Arc<SessionTransferClient>,
}

impl FlowOrchestrator {
    pub fn new(
        store: ConversationStore,
        queues: QueueTargets,
        locator: Arc<SessionLocator>,
        transfers: Arc<SessionTransferClient>,
    ) -> Self {
        Self {
            store,
            queues,
            locator,
            transfers,
        }
    }

    pub async fn handle_message(&self, user_id: &str, inbound_text: &str) -> String {
        self.handle_message_report(user_id, inbound_text).await.reply
    }

    pub async fn handle_message_report(&self, user_id: &str, inbound_text: &str) -> FlowOutcome {
        let start_time = Instant::now();

        // read-transition-write under the user's lock, released before PBX I/O
        let (previous, step) = {
            let mut guard = self.store.lock(user_id).await;
            let previous = guard.state();
            let step = transition(previous, inbound_text);
            guard.set(step.next);
            (previous, step)
        };

        info!(
            "Flow: user={}, {} -> {}, input_len={}",
            user_id,
            previous,
            step.next,
            inbound_text.len()
        );

        let escalation = match step.directive {
            TransferDirective::None => None,
            TransferDirective::Transfer(key) => Some(self.spawn_escalation(user_id, key)),
        };

        debug!(
            "Handled message for {} in {:?} (escalating: {})",
            user_id,
            start_time.elapsed(),
            escalation.is_some()
        );

        FlowOutcome {
            reply: step.reply.to_string(),
            previous,
            next: step.next,
            escalation,
        }
    }

    fn spawn_escalation(&self, user_id: &str, key: QueueKey) -> JoinHandle<EscalationReport> {
        let queue_id = self.queues.resolve(key);
        info!("Escalating {} to {} (queue {})", user_id, key.as_str(), queue_id);

        let locator = self.locator.clone();
        let transfers = self.transfers.clone();
        let user_id = user_id.to_string();
        let span = info_span!("escalation", user = %user_id, queue = queue_id);

        tokio::spawn(
            async move { escalate(&locator, &transfers, &user_id, queue_id).await }.instrument(span),
        )
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }
}

async fn escalate(
    locator: &SessionLocator,
    transfers: &SessionTransferClient,
    user_id: &str,
    queue_id: u64,
) -> EscalationReport {
    let Some(session_id) = locator.find_active_session(user_id).await else {
        info!("No PBX session to transfer for {}", user_id);
        return EscalationReport::NoActiveSession { queue_id };
    };

    let outcome = transfers.transfer(session_id, queue_id).await;
    EscalationReport::Attempted {
        session_id,
        queue_id,
        outcome,
    }
}
