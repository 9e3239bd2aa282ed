use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Chain RPC error: {0}")]
    Rpc(#[from] reqwest::Error),

    #[error("Chain returned error: {0}")]
    Chain(String),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
