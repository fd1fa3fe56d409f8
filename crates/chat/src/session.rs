use std::sync::Arc;

use guardchat_llm::{LlmProvider, SessionId, StreamTarget, TurnId};

use crate::config::SessionConfig;
use crate::error::ChatResult;
use crate::processor::{TurnStream, start_turn};
use crate::transcript::Transcript;

/// One chat session: an engine, fixed configuration and the transcript they grow.
///
/// Turns are strictly sequential: the returned [`TurnStream`] borrows the
/// session mutably, so a second submit cannot start while one is in flight.
pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    config: SessionConfig,
    session_id: SessionId,
    next_turn_id: TurnId,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn LlmProvider>, config: SessionConfig, session_id: SessionId) -> Self {
        Self {
            provider,
            config,
            session_id,
            next_turn_id: TurnId::new(1),
            transcript: Transcript::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Forgets the history. Turn ids keep counting so late events stay stale.
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Starts a turn for `message`.
    pub fn submit(&mut self, message: &str) -> ChatResult<TurnStream<'_>> {
        let target = StreamTarget::new(self.session_id, self.next_turn_id);
        // Reserve the id up front so a failed start never reuses it.
        self.next_turn_id = self.next_turn_id.next();

        start_turn(
            self.provider.as_ref(),
            &self.config,
            target,
            &mut self.transcript,
            message,
        )
    }
}
