//! Replays persisted conversation history.
//!
//! The service has stored replies in several shapes over time: plain strings,
//! serialized block payloads, the older `sources` listing, and records that
//! split reasoning, code and graph images into separate columns. Every shape
//! is folded into the same [`Turn`] model here. Records are never dropped,
//! reordered or merged.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::block::ContentBlock;
use super::error::ChatError;
use super::turn::Turn;

/// Prefix identifying the service's synthetic greeting record.
pub const WELCOME_MARKER: &str = "Welcome! I am a chatbot programmed to";

/// Greeting rendered for the welcome turn.
pub const WELCOME_GREETING: &str = "Welcome! I am a chatbot programmed to make an initial interview with you for the position you have selected. Are you ready to begin?";

/// Shown for a legacy `sources` payload with no entries.
pub const NO_SOURCES_MESSAGE: &str =
    "No data sources found for your query. Try rephrasing or asking about a different domain";

pub const CFG_SUBTYPE: &str = "cfg";
pub const DFG_SUBTYPE: &str = "dfg";

/// One history entry as the service returns it.
///
/// Older rows use `message_text`/`response_text`; newer ones `message`/`response`.
/// A field holding the wrong JSON type reads as absent; its siblings survive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub response: Option<ResponseField>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_text: Option<ResponseField>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub cfg_image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub dfg_image_url: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match serde_json::from_value::<Option<T>>(value) {
        Ok(field) => Ok(field),
        Err(e) => {
            tracing::warn!("ignoring history field with unexpected type: {e}");
            Ok(None)
        }
    }
}

/// A stored reply: either a string (which may itself hold serialized JSON) or
/// a JSON value the service already decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseField {
    Text(String),
    Structured(Value),
}

impl ResponseField {
    fn is_empty(&self) -> bool {
        match self {
            ResponseField::Text(s) => s.is_empty(),
            ResponseField::Structured(v) => v.is_null(),
        }
    }

    fn as_text(&self) -> Cow<'_, str> {
        match self {
            ResponseField::Text(s) => Cow::Borrowed(s),
            ResponseField::Structured(v) => Cow::Owned(v.to_string()),
        }
    }
}

impl RawRecord {
    pub fn new(message: Option<&str>, response: Option<&str>) -> Self {
        Self {
            message: message.map(str::to_string),
            response: response.map(|r| ResponseField::Text(r.to_string())),
            ..Default::default()
        }
    }

    pub fn user_message(&self) -> Option<&str> {
        non_empty(self.message.as_deref()).or_else(|| non_empty(self.message_text.as_deref()))
    }

    pub fn reply(&self) -> Option<&ResponseField> {
        [self.response.as_ref(), self.response_text.as_ref()]
            .into_iter()
            .flatten()
            .find(|r| !r.is_empty())
    }

    fn reasoning(&self) -> Option<&str> {
        non_empty(self.reasoning.as_deref())
    }

    fn cfg_image(&self) -> Option<&str> {
        non_empty(self.cfg_image_url.as_deref())
    }

    fn dfg_image(&self) -> Option<&str> {
        non_empty(self.dfg_image_url.as_deref())
    }

    /// Rows written after the reasoning/code split carry at least one of the
    /// dedicated columns.
    fn is_split(&self) -> bool {
        self.reasoning().is_some() || self.cfg_image().is_some() || self.dfg_image().is_some()
    }

    fn is_welcome(&self) -> bool {
        self.user_message().is_none()
            && matches!(self.reply(), Some(ResponseField::Text(t)) if t.trim_start().starts_with(WELCOME_MARKER))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(default)]
    path: String,
    #[serde(default)]
    reason: String,
}

/// A reply that decoded as something richer than plain text.
enum StructuredPayload {
    Blocks(Vec<ContentBlock>),
    Sources(Vec<Source>),
}

impl StructuredPayload {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if looks_like_blocks(items) => {
                Some(Self::Blocks(super::block::decode_blocks(items.clone())))
            }
            Value::Object(map) => match (map.get("content"), map.get("sources")) {
                (Some(Value::Array(items)), _) if looks_like_blocks(items) => {
                    Some(Self::Blocks(super::block::decode_blocks(items.clone())))
                }
                (_, Some(sources @ Value::Array(_))) => {
                    serde_json::from_value(sources.clone()).ok().map(Self::Sources)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            Self::Blocks(blocks) => blocks,
            Self::Sources(sources) if sources.is_empty() => {
                vec![ContentBlock::text(NO_SOURCES_MESSAGE)]
            }
            Self::Sources(sources) => sources
                .into_iter()
                .map(|s| ContentBlock::text(format!("Path: {}\nReason: {}", s.path, s.reason)))
                .collect(),
        }
    }
}

fn looks_like_blocks(items: &[Value]) -> bool {
    items
        .iter()
        .all(|item| item.get("type").is_some_and(Value::is_string))
}

/// Normalize history records into turns, oldest first.
pub fn normalize(records: &[RawRecord]) -> Vec<Turn> {
    records.iter().map(normalize_record).collect()
}

pub fn normalize_record(record: &RawRecord) -> Turn {
    if record.is_welcome() {
        return Turn::welcome();
    }

    let user_text = record.user_message().map(str::to_string);
    let blocks = if record.is_split() {
        split_blocks(record)
    } else {
        match record.reply() {
            Some(reply) => reply_blocks(reply),
            None => Vec::new(),
        }
    };

    Turn::exchange(user_text, blocks)
}

/// Reasoning, then the response as code, then the cfg and dfg graphs.
fn split_blocks(record: &RawRecord) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(4);
    if let Some(reasoning) = record.reasoning() {
        blocks.push(ContentBlock::reasoning(reasoning));
    }
    if let Some(reply) = record.reply() {
        blocks.push(ContentBlock::code(reply.as_text(), None));
    }
    if let Some(url) = record.cfg_image() {
        blocks.push(ContentBlock::image(url, Some(CFG_SUBTYPE)));
    }
    if let Some(url) = record.dfg_image() {
        blocks.push(ContentBlock::image(url, Some(DFG_SUBTYPE)));
    }
    blocks
}

fn reply_blocks(reply: &ResponseField) -> Vec<ContentBlock> {
    match reply {
        ResponseField::Text(text) => match parse_structured(text) {
            Ok(Some(payload)) => payload.into_blocks(),
            Ok(None) => vec![ContentBlock::text(text.as_str())],
            Err(e) => {
                tracing::debug!("{e}; rendering as plain text");
                vec![ContentBlock::text(text.as_str())]
            }
        },
        ResponseField::Structured(value) => match StructuredPayload::from_value(value) {
            Some(payload) => payload.into_blocks(),
            None => vec![ContentBlock::text(value.to_string())],
        },
    }
}

/// `Ok(None)` for text that was never meant to be JSON; `Err` for text that
/// looked structured but did not decode.
fn parse_structured(text: &str) -> Result<Option<StructuredPayload>, ChatError> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ChatError::HistoryRecordUnparseable(e.to_string()))?;
    StructuredPayload::from_value(&value)
        .map(Some)
        .ok_or_else(|| ChatError::HistoryRecordUnparseable("no content or sources array".into()))
}

/// The canonical stored form of a turn. Normalizing it yields the same turn.
pub fn canonical_record(turn: &Turn) -> RawRecord {
    if turn.is_welcome() {
        return RawRecord::new(None, Some(WELCOME_GREETING));
    }
    RawRecord {
        message: turn.user_text.clone(),
        response: turn
            .assistant
            .as_ref()
            .map(|blocks| ResponseField::Structured(serde_json::json!({ "content": blocks }))),
        ..Default::default()
    }
}
