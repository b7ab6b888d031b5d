pub mod pbx;
pub mod webhook;

pub use webhook::{InboundMessage, VerificationQuery, WebhookPayload};
