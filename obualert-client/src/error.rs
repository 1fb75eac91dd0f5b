use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Timeout connecting after {0:?}")]
    ConnectTimeout(Duration),
    #[error("Connection closed by peer")]
    Closed,
    #[error("Invalid User ID {0}")]
    InvalidUserId(i64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Shutdown")]
    Shutdown,
}

impl ClientError {
    /// Transport failures are retried; configuration problems and shutdown are not
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ClientError::InvalidUserId(_) | ClientError::Config(_) | ClientError::Shutdown
        )
    }
}
