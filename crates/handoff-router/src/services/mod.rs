pub mod conversation;
pub mod messenger;
pub mod orchestrator;
pub mod pbx;

pub use conversation::{ConversationState, ConversationStore, QueueTargets};
pub use messenger::{MessageSender, WhatsAppSender};
pub use orchestrator::{EscalationReport, FlowOrchestrator, FlowOutcome};
pub use pbx::{PbxClient, SessionLocator, SessionTransferClient, TokenManager};
