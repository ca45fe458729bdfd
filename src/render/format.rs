use crate::core::block::ContentBlock;
use crate::core::history::WELCOME_GREETING;
use crate::core::turn::Turn;

/// Caption for an image block without a subtype.
pub const DEFAULT_IMAGE_CAPTION: &str = "GRAPH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProseStyle {
    Plain,
    Reasoning,
}

/// One displayable piece of an assistant message. Bodies are carried exactly
/// as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFragment {
    Prose {
        style: ProseStyle,
        body: String,
    },
    Code {
        language: Option<String>,
        body: String,
    },
    Image {
        url: String,
        caption: String,
    },
    /// Highlighted greeting of the welcome turn.
    Greeting {
        body: String,
    },
}

impl RenderFragment {
    pub fn label(&self) -> &str {
        match self {
            RenderFragment::Prose {
                style: ProseStyle::Plain,
                ..
            } => "Response",
            RenderFragment::Prose {
                style: ProseStyle::Reasoning,
                ..
            } => "Reasoning",
            RenderFragment::Code {
                language: Some(lang),
                ..
            } => lang.as_str(),
            RenderFragment::Code { language: None, .. } => "Code",
            RenderFragment::Image { caption, .. } => caption.as_str(),
            RenderFragment::Greeting { .. } => "Welcome",
        }
    }
}

/// Map one block to its fragment. Unknown blocks yield `None` and are skipped
/// by callers.
pub fn format(block: &ContentBlock) -> Option<RenderFragment> {
    match block {
        ContentBlock::Text { body } => Some(RenderFragment::Prose {
            style: ProseStyle::Plain,
            body: body.clone(),
        }),
        ContentBlock::Reasoning { body } => Some(RenderFragment::Prose {
            style: ProseStyle::Reasoning,
            body: body.clone(),
        }),
        ContentBlock::Code { body, language } => Some(RenderFragment::Code {
            language: language.clone().filter(|l| !l.is_empty()),
            body: body.clone(),
        }),
        ContentBlock::Image { url, subtype } => Some(RenderFragment::Image {
            url: url.clone(),
            caption: subtype
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase)
                .unwrap_or_else(|| DEFAULT_IMAGE_CAPTION.to_string()),
        }),
        ContentBlock::Unknown => None,
    }
}

pub fn format_blocks(blocks: &[ContentBlock]) -> Vec<RenderFragment> {
    blocks.iter().filter_map(format).collect()
}

/// Fragments for the assistant side of a turn.
pub fn format_turn(turn: &Turn) -> Vec<RenderFragment> {
    if turn.is_welcome() {
        return vec![RenderFragment::Greeting {
            body: WELCOME_GREETING.to_string(),
        }];
    }
    format_blocks(turn.blocks())
}
