use snafu::OptionExt;

use crate::error::{ChatResult, NoInFlightTurnSnafu};
use crate::transcript::{Transcript, TurnStatus};

/// Grows the answer of the transcript's streaming turn.
///
/// Holds the transcript exclusively for the lifetime of one turn.
#[derive(Debug)]
pub struct TranscriptAccumulator<'a> {
    transcript: &'a mut Transcript,
}

impl<'a> TranscriptAccumulator<'a> {
    /// Fails when the transcript does not end with a streaming turn.
    pub fn new(transcript: &'a mut Transcript) -> ChatResult<Self> {
        transcript.in_flight().context(NoInFlightTurnSnafu {
            stage: "accumulator-new",
        })?;
        Ok(Self { transcript })
    }

    /// Appends visible text and returns the updated transcript.
    ///
    /// Returns `None` once the turn is finalized; a finished answer never changes.
    pub fn push_visible(&mut self, text: &str) -> Option<&Transcript> {
        let turn = self.transcript.in_flight_mut()?;
        turn.assistant_text.push_str(text);
        Some(&*self.transcript)
    }

    /// Seals the turn with `status`. Later calls keep the first final status.
    pub fn finalize(&mut self, status: TurnStatus) -> bool {
        debug_assert!(status.is_final());
        match self.transcript.in_flight_mut() {
            Some(turn) => {
                turn.status = status;
                true
            }
            None => false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.transcript.in_flight().is_none()
    }

    pub fn assistant_text(&self) -> &str {
        self.transcript
            .last()
            .map(|turn| turn.assistant_text.as_str())
            .unwrap_or_default()
    }

    pub fn transcript(&self) -> &Transcript {
        &*self.transcript
    }
}
