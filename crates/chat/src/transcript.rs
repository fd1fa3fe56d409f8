/// Lifecycle status for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Streaming,
    Done,
    Failed(String),
    Aborted,
}

impl TurnStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Streaming)
    }
}

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user_text: String,
    pub assistant_text: String,
    pub status: TurnStatus,
}

impl Turn {
    /// Creates the in-flight turn with an empty assistant placeholder.
    pub fn pending(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: String::new(),
            status: TurnStatus::Streaming,
        }
    }

    /// Creates an already finished turn, e.g. when restoring history.
    pub fn completed(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            status: TurnStatus::Done,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.status, TurnStatus::Streaming)
    }
}

/// Ordered chat history.
///
/// Append-only; only the last turn's `assistant_text` changes, and only while it streams.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The last turn, if it is still streaming.
    pub fn in_flight(&self) -> Option<&Turn> {
        self.turns.last().filter(|turn| turn.is_streaming())
    }

    pub(crate) fn in_flight_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut().filter(|turn| turn.is_streaming())
    }
}
