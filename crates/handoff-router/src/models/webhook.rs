use serde::{Deserialize, Serialize};

// ===== VERIFICATION =====

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

// ===== INBOUND PAYLOAD =====
// Only the fields the router reads; everything else is ignored.

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

/// `(user, text)` pair handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub text: String,
}

impl WebhookPayload {
    /// First message of the first change of the first entry.
    ///
    /// Non-text messages (images, audio, buttons) come through with empty text.
    pub fn first_message(&self) -> Option<InboundMessage> {
        let message = self
            .entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .first()?;

        if message.from.is_empty() {
            return None;
        }

        let text = message
            .text
            .as_ref()
            .map(|t| t.body.trim().to_string())
            .unwrap_or_default();

        Some(InboundMessage {
            from: message.from.clone(),
            text,
        })
    }
}

// ===== OUTBOUND =====

#[derive(Debug, Serialize)]
pub struct SendTextRequest<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    pub text: SendTextBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct SendTextBody<'a> {
    pub body: &'a str,
}

impl<'a> SendTextRequest<'a> {
    pub fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            text: SendTextBody { body },
        }
    }
}
