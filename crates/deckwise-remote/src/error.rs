// Remote error taxonomy.

use deckwise_core::LoadFailure;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("invalid player tag: {0}")]
    InvalidTag(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with an explicit error message.
    #[error("{0}")]
    Service(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Collapse into the load outcome stored by the session cache. Only an
    /// explicit service message survives; everything else is a generic
    /// transport failure.
    pub fn into_load_failure(self) -> LoadFailure {
        match self {
            RemoteError::Service(message) => LoadFailure::Service(message),
            other => LoadFailure::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}
