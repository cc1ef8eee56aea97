use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("not connected")]
    NotConnected,

    #[error("write deadline exceeded")]
    WriteTimeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
