use super::format::{format_turn, RenderFragment};
use crate::core::turn::Turn;

/// Identifies one "thinking" placeholder. Valid until removed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    User {
        text: Option<String>,
        attachment: Option<String>,
    },
    Assistant {
        fragments: Vec<RenderFragment>,
        show_avatar: bool,
    },
    Placeholder(PlaceholderHandle),
}

/// Operations the session controller drives. The controller never touches
/// transcript state except through these.
pub trait TranscriptView {
    fn append_turn(&mut self, turn: &Turn);
    fn append_placeholder(&mut self) -> PlaceholderHandle;
    /// Removing an already removed handle is a no-op.
    fn remove_placeholder(&mut self, handle: PlaceholderHandle);
    fn scroll_to_latest(&mut self);
}

/// In-memory transcript: the turn list plus the entries a front end draws.
#[derive(Debug)]
pub struct Transcript {
    turns: Vec<Turn>,
    entries: Vec<Entry>,
    next_placeholder: u64,
    follow_latest: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            entries: Vec::new(),
            next_placeholder: 0,
            follow_latest: true,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn has_placeholder(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, Entry::Placeholder(_)))
    }

    pub fn follows_latest(&self) -> bool {
        self.follow_latest
    }

    /// The user scrolled away from the bottom.
    pub fn release_scroll(&mut self) {
        self.follow_latest = false;
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.entries.clear();
        self.follow_latest = true;
    }
}

impl TranscriptView for Transcript {
    fn append_turn(&mut self, turn: &Turn) {
        if turn.has_user_side() {
            self.entries.push(Entry::User {
                text: turn.user_text.clone(),
                attachment: turn.attachment_name.clone(),
            });
        }
        if turn.is_welcome() || turn.assistant.is_some() {
            self.entries.push(Entry::Assistant {
                fragments: format_turn(turn),
                show_avatar: !turn.is_welcome(),
            });
        }
        self.turns.push(turn.clone());
        self.scroll_to_latest();
    }

    fn append_placeholder(&mut self) -> PlaceholderHandle {
        let handle = PlaceholderHandle(self.next_placeholder);
        self.next_placeholder += 1;
        self.entries.push(Entry::Placeholder(handle));
        self.scroll_to_latest();
        handle
    }

    fn remove_placeholder(&mut self, handle: PlaceholderHandle) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| *e == Entry::Placeholder(handle))
        {
            self.entries.remove(pos);
        }
    }

    fn scroll_to_latest(&mut self) {
        self.follow_latest = true;
    }
}
