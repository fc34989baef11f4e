// Chat session: decides per message whether the account context must be
// attached, and keeps a transcript whose "thinking" placeholders are matched
// to replies by token rather than by position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;
use crate::model::{AccountSnapshot, CatalogEntry};
use crate::session::SessionCache;

pub const DEFAULT_THINKING_PLACEHOLDER: &str = "Thinking...";

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Correlates an outgoing message with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageToken(pub u64);

impl std::fmt::Display for MessageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Full account context, attached to the first message of an account session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatContext {
    pub account: AccountSnapshot,
    /// Absent when the catalog has not loaded; the message is sent anyway.
    pub catalog: Option<Vec<CatalogEntry>>,
}

/// Request body for the conversational endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

/// A request ready for dispatch together with its correlation token.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub token: MessageToken,
    pub request: ChatRequest,
}

// ---------------------------------------------------------------------------
// ChatSessionManager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    /// The next message carries the full context.
    ContextPending,
    /// The remote side already has the context for the current account.
    ContextSent,
}

/// Context-attachment state machine.
///
/// The state is bound to the cache's account generation: as soon as a new
/// account load begins (or the session is torn down) the generation moves
/// and the manager falls back to `ContextPending` without being told.
#[derive(Debug, Default)]
pub struct ChatSessionManager {
    sent_for: Option<(u64, u64)>,
    next_token: u64,
}

impl ChatSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, cache: &SessionCache) -> ChatState {
        if self.sent_for == Some(cache.account_generation()) {
            ChatState::ContextSent
        } else {
            ChatState::ContextPending
        }
    }

    /// Build the payload for one user message.
    ///
    /// Fails without changing state when no account is loaded or the text is
    /// blank. In `ContextPending` the account and catalog snapshots are
    /// embedded and the state moves to `ContextSent`.
    pub fn build_outgoing_payload(
        &mut self,
        cache: &SessionCache,
        text: &str,
    ) -> Result<OutgoingMessage, SessionError> {
        let account = cache.account().ok_or(SessionError::NoAccountLoaded)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let context = match self.state(cache) {
            ChatState::ContextPending => {
                let catalog = cache.catalog_entries().map(|entries| entries.as_ref().clone());
                if catalog.is_none() {
                    debug!("catalog not loaded, sending context without it");
                }
                self.sent_for = Some(cache.account_generation());
                Some(ChatContext {
                    account: account.as_ref().clone(),
                    catalog,
                })
            }
            ChatState::ContextSent => None,
        };

        self.next_token += 1;
        let token = MessageToken(self.next_token);
        debug!(%token, with_context = context.is_some(), "built chat payload");

        Ok(OutgoingMessage {
            token,
            request: ChatRequest {
                text: text.to_string(),
                context,
            },
        })
    }

    /// Force the next message to carry the context again.
    pub fn reset(&mut self) {
        self.sent_for = None;
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: ChatRole,
    pub text: String,
    /// Set while this entry is a placeholder awaiting the reply to `token`.
    pub pending: Option<MessageToken>,
    pub at: DateTime<Utc>,
}

/// Ordered chat history with token-bound placeholders.
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    entries: Vec<TranscriptEntry>,
    placeholder: String,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new(DEFAULT_THINKING_PLACEHOLDER)
    }
}

impl ChatTranscript {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            placeholder: placeholder.into(),
        }
    }

    /// Record a sent message and its placeholder.
    pub fn push_outgoing(&mut self, token: MessageToken, text: &str) {
        let now = Utc::now();
        self.entries.push(TranscriptEntry {
            role: ChatRole::User,
            text: text.to_string(),
            pending: None,
            at: now,
        });
        self.entries.push(TranscriptEntry {
            role: ChatRole::Assistant,
            text: self.placeholder.clone(),
            pending: Some(token),
            at: now,
        });
    }

    /// Replace the placeholder for `token` with the reply. Returns `false`
    /// for unknown or already-resolved tokens.
    pub fn resolve(&mut self, token: MessageToken, reply: &str) -> bool {
        self.settle(token, ChatRole::Assistant, reply)
    }

    /// Replace the placeholder for `token` with an error line.
    pub fn fail(&mut self, token: MessageToken, message: &str) -> bool {
        self.settle(token, ChatRole::Error, message)
    }

    fn settle(&mut self, token: MessageToken, role: ChatRole, text: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.pending == Some(token)) else {
            debug!(%token, "no pending placeholder for token, ignoring");
            return false;
        };
        entry.role = role;
        entry.text = text.to_string();
        entry.pending = None;
        entry.at = Utc::now();
        true
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.pending.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
