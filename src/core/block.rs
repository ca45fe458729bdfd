use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(alias = "text", alias = "content")]
        body: String,
    },
    Code {
        #[serde(alias = "text", alias = "content")]
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtype: Option<String>,
    },
    /// Legacy model reasoning, shown like text but set apart.
    Reasoning {
        #[serde(alias = "text", alias = "content")]
        body: String,
    },
    /// Any tag this client does not know. Dropped by the formatter.
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn code(body: impl Into<String>, language: Option<String>) -> Self {
        Self::Code {
            body: body.into(),
            language,
        }
    }

    pub fn image(url: impl Into<String>, subtype: Option<&str>) -> Self {
        Self::Image {
            url: url.into(),
            subtype: subtype.map(str::to_string),
        }
    }

    pub fn reasoning(body: impl Into<String>) -> Self {
        Self::Reasoning { body: body.into() }
    }
}

/// Decode a JSON array of blocks leniently: entries that fail to decode are
/// skipped so one bad block never costs the rest of the reply.
pub fn decode_blocks(values: Vec<serde_json::Value>) -> Vec<ContentBlock> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<ContentBlock>(v) {
            Ok(block) => Some(block),
            Err(e) => {
                tracing::debug!("skipping undecodable content block: {e}");
                None
            }
        })
        .collect()
}
