mod http;

pub use http::HttpChatService;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::attachment::Attachment;
use crate::core::block::{decode_blocks, ContentBlock};
use crate::core::error::{ChatError, GENERIC_FAILURE};
use crate::core::history::RawRecord;
use crate::core::status::{AccountStatus, Decision};

/// A successful chat or upload reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatReply {
    pub content: Vec<ContentBlock>,
    /// Set by the service when this exchange concluded the conversation.
    pub decision: Option<Decision>,
}

/// The remote assistant. Every call is authenticated with a bearer token the
/// caller has already obtained.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat(&self, token: &str, query: &str) -> Result<ChatReply, ChatError>;

    async fn upload(
        &self,
        token: &str,
        attachment: &Attachment,
        query: Option<&str>,
    ) -> Result<ChatReply, ChatError>;

    async fn history(&self, token: &str) -> Result<Vec<RawRecord>, ChatError>;

    async fn account_status(&self, token: &str) -> Result<AccountStatus, ChatError>;
}

/// The one outbound request a submission produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRequest {
    Text {
        query: String,
    },
    Upload {
        attachment: Attachment,
        query: Option<String>,
    },
}

impl ChatRequest {
    pub fn new(query: String, attachment: Option<Attachment>) -> Self {
        match attachment {
            Some(attachment) => ChatRequest::Upload {
                attachment,
                query: Some(query).filter(|q| !q.is_empty()),
            },
            None => ChatRequest::Text { query },
        }
    }

    pub async fn send(
        &self,
        service: &dyn ChatService,
        token: &str,
    ) -> Result<ChatReply, ChatError> {
        match self {
            ChatRequest::Text { query } => service.chat(token, query).await,
            ChatRequest::Upload { attachment, query } => {
                service.upload(token, attachment, query.as_deref()).await
            }
        }
    }
}

/// Decode a 2xx chat body. The `content` array must be present; it may be
/// empty.
pub fn parse_reply(body: &str) -> Result<ChatReply, ChatError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
    let content = match value.get("content") {
        Some(Value::Array(items)) => decode_blocks(items.clone()),
        Some(_) => {
            return Err(ChatError::MalformedResponse(
                "`content` is not an array".into(),
            ))
        }
        None => {
            return Err(ChatError::MalformedResponse(
                "reply has no `content` array".into(),
            ))
        }
    };
    let decision = value
        .get("decision")
        .and_then(Value::as_str)
        .map(|d| Decision::from(d.to_string()));
    Ok(ChatReply { content, decision })
}

/// Message for a non-success response: the service's `detail` when present.
pub fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    match detail {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Null) | None => GENERIC_FAILURE.to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn parse_history(body: &str) -> Result<Vec<RawRecord>, ChatError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
    let Some(Value::Array(items)) = value.get("history") else {
        return Err(ChatError::MalformedResponse(
            "reply has no `history` array".into(),
        ));
    };
    Ok(items
        .iter()
        .map(|item| {
            serde_json::from_value::<RawRecord>(item.clone()).unwrap_or_else(|e| {
                // not an object; keep the slot so turn counts line up with the store
                tracing::warn!("history record is not an object: {e}");
                RawRecord::default()
            })
        })
        .collect())
}

pub fn parse_status(body: &str) -> Result<AccountStatus, ChatError> {
    serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse(e.to_string()))
}
