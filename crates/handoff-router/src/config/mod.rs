pub mod settings;

pub use settings::{
    ChannelConfig, ConversationConfig, LoggingConfig, PbxConfig, QueuesConfig, ServerConfig,
    Settings,
};
