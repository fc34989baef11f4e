// HTTP client for the remote game/assistant service.
//
// Three endpoints: `GET /cards`, `POST /player` with `{"tag": ...}`, and
// `POST /chat` with `{"mensagem": ..., "contexto": ...}` answered by
// `{"resposta": ...}`. Response bodies are handed to `deckwise_core::wire`
// for coercion; this module only deals with transport, request bodies,
// status codes and failure bodies.

use std::time::Duration;

use async_trait::async_trait;
use deckwise_core::chat::{ChatContext, ChatRequest};
use deckwise_core::wire;
use deckwise_core::{AccountSnapshot, CatalogEntry};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::tag::PlayerTag;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const CATALOG_PATH: &str = "/cards";
const PLAYER_PATH: &str = "/player";
const CHAT_PATH: &str = "/chat";

/// Longest slice of an error body kept in `RemoteError::Status`.
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PlayerBody<'a> {
    tag: &'a str,
}

/// `ChatRequest` as the service names its fields.
#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    mensagem: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contexto: Option<ContextBody<'a>>,
}

#[derive(Debug, Serialize)]
struct ContextBody<'a> {
    player: &'a AccountSnapshot,
    cards: Option<&'a [CatalogEntry]>,
}

impl<'a> ChatBody<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            mensagem: &request.text,
            contexto: request.context.as_ref().map(ContextBody::from_context),
        }
    }
}

impl<'a> ContextBody<'a> {
    fn from_context(context: &'a ChatContext) -> Self {
        Self {
            player: &context.account,
            cards: context.catalog.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteService
// ---------------------------------------------------------------------------

/// Everything the app needs from the outside world.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, RemoteError>;

    async fn fetch_account(&self, tag: &PlayerTag) -> Result<AccountSnapshot, RemoteError>;

    /// Send one chat message and return the assistant's reply.
    async fn send_chat(&self, request: &ChatRequest) -> Result<String, RemoteError>;
}

// ---------------------------------------------------------------------------
// HttpRemote
// ---------------------------------------------------------------------------

/// `RemoteService` over HTTP/JSON.
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpRemote {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_token: Option<String>,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("accept", "application/json");
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return its JSON body, mapping failures.
    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, RemoteError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "remote response");
        parse_body(status.as_u16(), &text)
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, RemoteError> {
        let body = self.send_json(self.http.get(self.url(CATALOG_PATH))).await?;
        wire::catalog_from_value(body).map_err(classify_wire_error)
    }

    async fn fetch_account(&self, tag: &PlayerTag) -> Result<AccountSnapshot, RemoteError> {
        let payload = PlayerBody { tag: tag.as_str() };
        let body = self
            .send_json(self.http.post(self.url(PLAYER_PATH)).json(&payload))
            .await?;
        wire::account_from_value(body, tag.as_str()).map_err(classify_wire_error)
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<String, RemoteError> {
        let body = self
            .send_json(
                self.http
                    .post(self.url(CHAT_PATH))
                    .json(&ChatBody::from_request(request)),
            )
            .await?;
        reply_from_value(&body)
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

/// Turn a status code and raw body into JSON or a `RemoteError`.
///
/// A failure body (`{"error": ...}` or, on non-2xx, `{"message": ...}`) wins
/// over the status code so the user sees the service's own wording.
pub(crate) fn parse_body(status: u16, text: &str) -> Result<Value, RemoteError> {
    let parsed: Result<Value, _> = serde_json::from_str(text);
    let success = (200..300).contains(&status);

    if let Ok(value) = &parsed {
        if let Some(message) = wire::service_error(value) {
            return Err(RemoteError::Service(message));
        }
        if !success {
            if let Some(message) = value.get("message").and_then(Value::as_str) {
                return Err(RemoteError::Service(message.to_string()));
            }
        }
    }

    if !success {
        warn!(status, "remote request failed");
        return Err(RemoteError::Status {
            status,
            body: truncate(text, MAX_ERROR_BODY),
        });
    }

    parsed.map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Extract the assistant's reply: `{"resposta": "..."}`, `{"reply": "..."}`
/// or a bare JSON string.
pub(crate) fn reply_from_value(value: &Value) -> Result<String, RemoteError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => ["resposta", "reply"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode("chat response has no reply text".to_string())),
        _ => Err(RemoteError::Decode("chat response is not an object".to_string())),
    }
}

/// `wire` reports structured failures and shape errors as plain strings;
/// structured failures were already caught in `parse_body`, so whatever
/// reaches here is a shape problem.
fn classify_wire_error(message: String) -> RemoteError {
    RemoteError::Decode(message)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
