// Player tag normalization.

use crate::error::RemoteError;

/// A normalized player tag: trimmed, upper-cased, `#`-prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerTag(String);

impl PlayerTag {
    /// Normalize user input. Empty input (or a lone `#`) is rejected, and so
    /// is anything but ASCII letters and digits after the leading `#`.
    pub fn parse(input: &str) -> Result<Self, RemoteError> {
        let trimmed = input.trim();
        let body = trimmed.trim_start_matches('#').trim();
        if body.is_empty() {
            return Err(RemoteError::InvalidTag("player tag is required".to_string()));
        }
        if !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RemoteError::InvalidTag(format!("malformed tag `{trimmed}`")));
        }
        Ok(PlayerTag(format!("#{}", body.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
