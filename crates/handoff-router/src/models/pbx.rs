use serde::{Deserialize, Deserializer, Serialize};

// ===== TOKEN =====

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub access_token_expire_time: Option<i64>,
}

/// Token as handed out by the PBX, before the safety margin is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub ttl_seconds: i64,
}

// ===== SESSIONS =====

#[derive(Debug, Deserialize)]
pub struct SessionListResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub list: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSummary {
    #[serde(deserialize_with = "numeric_or_string")]
    pub id: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TransferRequest {
    pub session_id: i64,
    pub from_member_id: i64,
    pub destination_type: &'static str,
    pub destination_id: u64,
}

impl TransferRequest {
    pub fn to_queue(session_id: i64, queue_id: u64) -> Self {
        Self {
            session_id,
            from_member_id: 0,
            destination_type: "queue",
            destination_id: queue_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
}

/// Session ids arrive as numbers, some firmware sends them quoted
fn numeric_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
