pub mod signature;
pub mod verification;

pub use signature::WebhookSignatureValidator;
pub use verification::is_valid_verification;
