#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {target}: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("invalid connection target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for ClientError {
    fn from(e: mongodb::error::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
