pub mod format;
pub mod transcript;

pub use format::{format, format_blocks, format_turn, ProseStyle, RenderFragment};
pub use transcript::{Entry, PlaceholderHandle, Transcript, TranscriptView};
