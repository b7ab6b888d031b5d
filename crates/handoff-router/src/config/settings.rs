use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub channel: ChannelConfig,
    pub pbx: PbxConfig,
    pub queues: QueuesConfig,
    pub conversation: ConversationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// WhatsApp Cloud API channel
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChannelConfig {
    /// Secret echoed back by Meta during webhook verification
    pub verify_token: String,
    /// Bearer token for the Graph API
    pub access_token: String,
    pub phone_number_id: String,
    pub graph_base_url: String,
    /// Enables X-Hub-Signature-256 checking when set
    #[serde(default)]
    pub app_secret: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PbxConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// User-type classifier sent with session list queries
    pub user_type: String,
    pub token_safety_margin_seconds: i64,
    pub timeout_seconds: u64,
}

/// Queue ids for the four escalation targets
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct QueuesConfig {
    pub branch_a_default: u64,
    pub branch_a_post_sale: u64,
    pub branch_b_default: u64,
    pub branch_b_post_sale: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    pub idle_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub max_tracked_users: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_sources(Some("config/settings"), std::env::vars().collect())
    }

    /// Layer the optional settings file and `vars` over the defaults.
    /// `APP__SECTION__KEY` variables win over the file; the legacy flat
    /// variables win over both.
    fn from_sources(settings_file: Option<&str>, vars: config::Map<String, String>) -> Result<Self> {
        let legacy = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let mut builder = Self::builder()?;
        if let Some(path) = settings_file {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            // Legacy flat variables from older .env files
            .set_override_option("server.port", legacy("PORT"))?
            .set_override_option("channel.verify_token", legacy("VERIFY_TOKEN"))?
            .set_override_option("channel.access_token", legacy("WHATSAPP_TOKEN"))?
            .set_override_option("channel.phone_number_id", legacy("PHONE_NUMBER_ID"))?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Defaults shared by `load` and tests
    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("channel.verify_token", "")?
            .set_default("channel.access_token", "")?
            .set_default("channel.phone_number_id", "")?
            .set_default("channel.graph_base_url", "https://graph.facebook.com/v20.0")?
            .set_default("channel.timeout_seconds", 8)?
            .set_default("pbx.base_url", "http://127.0.0.1:8088")?
            .set_default("pbx.username", "")?
            .set_default("pbx.password", "")?
            .set_default("pbx.user_type", "visitor")?
            .set_default("pbx.token_safety_margin_seconds", 60)?
            .set_default("pbx.timeout_seconds", 8)?
            .set_default("queues.branch_a_default", 0)?
            .set_default("queues.branch_a_post_sale", 0)?
            .set_default("queues.branch_b_default", 0)?
            .set_default("queues.branch_b_post_sale", 0)?
            .set_default("conversation.idle_ttl_seconds", 6 * 60 * 60)?
            .set_default("conversation.sweep_interval_seconds", 300)?
            .set_default("conversation.max_tracked_users", 50_000)?
            .set_default("logging.level", "info,handoff_router=debug")?
            .set_default("logging.json", true)
    }

    pub fn app_secret(&self) -> Option<&str> {
        self.channel
            .app_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }
}
