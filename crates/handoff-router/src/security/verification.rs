/// Mode Meta sends when subscribing a webhook
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Webhook verification handshake check.
///
/// An empty configured secret never verifies.
pub fn is_valid_verification(mode: &str, token: &str, expected_token: &str) -> bool {
    mode == SUBSCRIBE_MODE && !expected_token.is_empty() && token == expected_token
}
