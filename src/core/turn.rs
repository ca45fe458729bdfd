use serde::{Deserialize, Serialize};

use super::block::ContentBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    #[default]
    Exchange,
    /// Synthetic greeting shown before the first exchange.
    Welcome,
}

/// One user submission paired with at most one assistant reply.
///
/// `assistant` is `None` while no reply is attached and `Some(vec![])` for an
/// empty reply. A turn with neither side is only built as the welcome turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub kind: TurnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<Vec<ContentBlock>>,
}

impl Turn {
    pub fn welcome() -> Self {
        Self {
            kind: TurnKind::Welcome,
            ..Default::default()
        }
    }

    /// User side only; the reply arrives as its own turn.
    pub fn user(text: Option<String>, attachment_name: Option<String>) -> Self {
        Self {
            kind: TurnKind::Exchange,
            user_text: text,
            attachment_name,
            assistant: None,
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            kind: TurnKind::Exchange,
            user_text: None,
            attachment_name: None,
            assistant: Some(blocks),
        }
    }

    pub fn exchange(user_text: Option<String>, blocks: Vec<ContentBlock>) -> Self {
        Self {
            kind: TurnKind::Exchange,
            user_text,
            attachment_name: None,
            assistant: Some(blocks),
        }
    }

    /// The inline error entry shown in place of a reply.
    pub fn error(message: String) -> Self {
        Self::assistant(vec![ContentBlock::text(message)])
    }

    pub fn is_welcome(&self) -> bool {
        self.kind == TurnKind::Welcome
    }

    pub fn has_user_side(&self) -> bool {
        self.user_text.is_some() || self.attachment_name.is_some()
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        self.assistant.as_deref().unwrap_or(&[])
    }
}
