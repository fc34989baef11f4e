// Error types shared across the core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which remotely-loaded resource an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    Account,
    Catalog,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Account => f.write_str("account"),
            Resource::Catalog => f.write_str("catalog"),
        }
    }
}

/// Precondition violations. Rejected synchronously, no state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{resource} load already in progress")]
    AlreadyInProgress { resource: Resource },

    #[error("no account loaded")]
    NoAccountLoaded,

    #[error("message is empty")]
    EmptyMessage,
}

/// Why a load produced no data. Both variants have the same effect on state;
/// they differ only in what the user is told.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LoadFailure {
    /// Transport, status or decode failure.
    #[error("load failed: {0}")]
    Transport(String),

    /// The service answered with an explicit error message.
    #[error("{0}")]
    Service(String),
}

impl LoadFailure {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> &str {
        match self {
            LoadFailure::Transport(_) => "Load failed",
            LoadFailure::Service(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SessionError::AlreadyInProgress {
                resource: Resource::Catalog
            }
            .to_string(),
            "catalog load already in progress"
        );
        assert_eq!(SessionError::NoAccountLoaded.to_string(), "no account loaded");
        assert_eq!(
            LoadFailure::Transport("connection refused".into()).to_string(),
            "load failed: connection refused"
        );
    }

    #[test]
    fn user_message_hides_transport_detail() {
        assert_eq!(LoadFailure::Transport("tcp reset".into()).user_message(), "Load failed");
        assert_eq!(LoadFailure::Service("Player not found".into()).user_message(), "Player not found");
    }
}
