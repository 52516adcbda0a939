use thiserror::Error;

use crate::knowledge::KnowledgeError;

/// Everything that can stop the bot from coming up. None of these are
/// recoverable: `main` bails out with the error.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("required setting `{0}` is not set")]
    MissingSetting(&'static str),

    #[error("required setting `{0}` is empty")]
    EmptySetting(&'static str),

    #[error("failed to load FAQ: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("public url `{0}` must be an absolute https:// url")]
    InvalidPublicUrl(String),

    #[error("failed to register webhook: {0}")]
    Webhook(#[from] teloxide::RequestError),
}
