use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpswatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Event source error: {0}")]
    Source(String),

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, OpswatchError>;
