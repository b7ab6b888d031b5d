//! Conversation flow: the menu state machine and per-user state storage
//!
//! - `engine`: pure transition function, reply texts
//! - `store`: per-user serialized state with idle/LRU eviction

pub mod engine;
mod store;
pub mod types;

pub use engine::transition;
pub use store::{ConversationGuard, ConversationStore};
pub use types::{ConversationState, QueueKey, QueueTargets, TransferDirective, Transition};
