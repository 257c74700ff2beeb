//! Generation sessions.

use picturebook_core::types::{new_id, Timestamp};

/// One earlier exchange kept for providers that replay conversation context.
#[derive(Debug, Clone)]
pub struct SessionTurn {
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
}

/// Handle grouping the generation calls of one run.
///
/// The session owns its message counter, so closing (dropping) it releases
/// all per-session state. Adapters that replay context keep it in
/// `history`.
#[derive(Debug)]
pub struct GenerationSession {
    id: String,
    project_id: String,
    message_index: u32,
    opened_at: Timestamp,
    history: Vec<SessionTurn>,
}

impl GenerationSession {
    pub fn open(project_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            project_id: project_id.into(),
            message_index: 0,
            opened_at: chrono::Utc::now(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Number of generation calls made in this session so far.
    pub fn message_index(&self) -> u32 {
        self.message_index
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    /// Time since the session was opened.
    pub fn open_duration(&self) -> chrono::Duration {
        chrono::Utc::now() - self.opened_at
    }

    /// Count a new generation call and return its 1-based index.
    pub fn next_message(&mut self) -> u32 {
        self.message_index += 1;
        self.message_index
    }

    pub fn history(&self) -> &[SessionTurn] {
        &self.history
    }

    /// Remember a completed turn, keeping at most `max_turns` of the most
    /// recent ones.
    pub fn push_turn(&mut self, turn: SessionTurn, max_turns: usize) {
        self.history.push(turn);
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(..excess);
        }
    }
}
