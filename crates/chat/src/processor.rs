//! Drives one chat turn from request to finalized answer.
//!
//! [`TurnStream`] is a pull-based sequence: every call to
//! [`TurnStream::next_snapshot`] drains engine events until a visible fragment
//! changes the transcript, the stream ends, or generation fails.

use futures::Stream;
use guardchat_llm::{
    LlmProvider, ProviderEventStream, StreamEventPayload, StreamRequest, StreamTarget,
};
use snafu::ResultExt;

use crate::accumulator::TranscriptAccumulator;
use crate::config::SessionConfig;
use crate::conversation::build_request_messages;
use crate::error::{ChatError, ChatResult, StartGenerationSnafu, StreamClosedSnafu};
use crate::segmenter::{Classified, FragmentClass, SegmentTransition, Segmenter};
use crate::transcript::{Transcript, TurnStatus};

/// `tracing` target for the operator-facing reasoning echo.
pub const REASONING_LOG_TARGET: &str = "guardchat::reasoning";
/// `tracing` target for inbound user messages.
pub const TURN_LOG_TARGET: &str = "guardchat::turn";

/// Collects reasoning text for the diagnostic log. Never feeds the transcript.
#[derive(Debug)]
struct ReasoningEcho {
    target: StreamTarget,
    buffer: String,
    open: bool,
}

impl ReasoningEcho {
    fn new(target: StreamTarget) -> Self {
        Self {
            target,
            buffer: String::new(),
            open: false,
        }
    }

    fn observe(&mut self, classified: Classified, fragment: &str) {
        match classified.transition {
            Some(SegmentTransition::Entered) => {
                self.open = true;
                tracing::debug!(
                    target: REASONING_LOG_TARGET,
                    turn_id = self.target.turn_id.0,
                    "reasoning segment started"
                );
            }
            Some(SegmentTransition::Continued) => self.push(fragment),
            Some(SegmentTransition::Exited) => self.flush("closed"),
            None => {}
        }
    }

    fn push(&mut self, fragment: &str) {
        tracing::trace!(target: REASONING_LOG_TARGET, fragment, "reasoning fragment");
        self.buffer.push_str(fragment);
    }

    fn flush(&mut self, outcome: &'static str) {
        if self.open || !self.buffer.is_empty() {
            tracing::info!(
                target: REASONING_LOG_TARGET,
                turn_id = self.target.turn_id.0,
                outcome,
                "Thinking: {}",
                self.buffer.trim()
            );
        }
        self.buffer.clear();
        self.open = false;
    }
}

/// The in-flight turn. Holds the transcript exclusively until dropped.
///
/// Dropping an unfinished turn aborts it.
pub struct TurnStream<'a> {
    target: StreamTarget,
    events: ProviderEventStream,
    segmenter: Segmenter,
    accumulator: TranscriptAccumulator<'a>,
    reasoning: ReasoningEcho,
}

/// Opens a turn: appends the placeholder turn, sends the request, spawns the engine worker.
///
/// Must be called inside a tokio runtime. When the engine refuses the request
/// the new turn is finalized as failed before the error is returned.
pub fn start_turn<'a>(
    provider: &dyn LlmProvider,
    config: &SessionConfig,
    target: StreamTarget,
    transcript: &'a mut Transcript,
    message: &str,
) -> ChatResult<TurnStream<'a>> {
    tracing::info!(
        target: TURN_LOG_TARGET,
        turn_id = target.turn_id.0,
        "User: {message}"
    );

    let messages = build_request_messages(config, transcript, message);
    let mut request = StreamRequest::new(target, config.model_id.clone(), messages);
    if let Some(temperature) = config.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let mut accumulator = TranscriptAccumulator::new(transcript)?;
    let handle = match provider.stream_chat(request) {
        Ok(handle) => handle,
        Err(error) => {
            tracing::error!(
                turn_id = target.turn_id.0,
                provider_id = %provider.id(),
                error = %error,
                "engine rejected the request"
            );
            accumulator.finalize(TurnStatus::Failed(error.to_string()));
            return Err(error).context(StartGenerationSnafu {
                stage: "start-turn-stream-chat",
            });
        }
    };

    // Detached: the worker exits once it sees cancellation or finishes the stream.
    tokio::spawn(handle.worker);

    Ok(TurnStream {
        target,
        events: handle.stream,
        segmenter: Segmenter::new(config.think_mode, config.markers.clone()),
        accumulator,
        reasoning: ReasoningEcho::new(target),
    })
}

impl<'a> TurnStream<'a> {
    pub fn target(&self) -> StreamTarget {
        self.target
    }

    /// Visible answer accumulated so far.
    pub fn assistant_text(&self) -> &str {
        self.accumulator.assistant_text()
    }

    pub fn is_finished(&self) -> bool {
        self.accumulator.is_finalized()
    }

    /// Pulls until the transcript changes and returns it.
    ///
    /// `None` means the turn is over. A failure is reported once as `Some(Err)`,
    /// after which the sequence ends; the partial answer stays in the transcript.
    pub async fn next_snapshot(&mut self) -> Option<ChatResult<&Transcript>> {
        loop {
            if self.accumulator.is_finalized() {
                return None;
            }

            let Some(event) = self.events.recv().await else {
                let error = StreamClosedSnafu {
                    stage: "turn-stream-recv",
                    target: self.target,
                }
                .build();
                self.finish(TurnStatus::Failed(error.to_string()));
                return Some(Err(error));
            };

            if event.target != self.target {
                tracing::debug!(
                    expected = ?self.target,
                    received = ?event.target,
                    "dropping event from a stale stream"
                );
                continue;
            }

            match event.payload {
                StreamEventPayload::Delta(fragment) => {
                    let Some(classified) = self.segmenter.classify(&fragment) else {
                        continue;
                    };
                    self.reasoning.observe(classified, &fragment);

                    if classified.class == FragmentClass::Visible
                        && self.accumulator.push_visible(&fragment).is_some()
                    {
                        return Some(Ok(self.accumulator.transcript()));
                    }
                }
                StreamEventPayload::ReasoningDelta(fragment) => {
                    if !fragment.is_empty() {
                        self.reasoning.push(&fragment);
                    }
                }
                StreamEventPayload::Done => {
                    self.finish(TurnStatus::Done);
                    return None;
                }
                StreamEventPayload::Error(message) => {
                    tracing::warn!(
                        turn_id = self.target.turn_id.0,
                        error = %message,
                        partial_len = self.accumulator.assistant_text().len(),
                        "generation failed; keeping partial answer"
                    );
                    self.finish(TurnStatus::Failed(message.clone()));
                    return Some(Err(ChatError::Generation {
                        stage: "turn-stream-event",
                        target: self.target,
                        message,
                    }));
                }
            }
        }
    }

    /// Stops generation. The answer stays at its last emitted value.
    ///
    /// Returns false when the turn had already finished.
    pub fn abort(&mut self) -> bool {
        if self.accumulator.is_finalized() {
            return false;
        }

        self.events.cancel();
        self.finish(TurnStatus::Aborted);
        tracing::info!(
            turn_id = self.target.turn_id.0,
            kept_len = self.accumulator.assistant_text().len(),
            "turn aborted"
        );
        true
    }

    /// Drains the turn, discarding intermediate snapshots.
    pub async fn run_to_end(mut self) -> ChatResult<()> {
        while let Some(snapshot) = self.next_snapshot().await {
            snapshot?;
        }
        Ok(())
    }

    /// Owned-snapshot adapter for consumers that want a [`Stream`].
    pub fn into_snapshots(self) -> impl Stream<Item = ChatResult<Transcript>> + 'a {
        futures::stream::unfold(self, |mut turn| async move {
            let item = turn.next_snapshot().await?.map(Transcript::clone);
            Some((item, turn))
        })
    }

    fn finish(&mut self, status: TurnStatus) {
        let outcome = match status {
            TurnStatus::Done if self.reasoning.open => "unterminated",
            TurnStatus::Done => "closed",
            TurnStatus::Aborted => "aborted",
            TurnStatus::Failed(_) | TurnStatus::Streaming => "failed",
        };
        self.reasoning.flush(outcome);
        self.accumulator.finalize(status);
    }
}

impl Drop for TurnStream<'_> {
    fn drop(&mut self) {
        if !self.accumulator.is_finalized() {
            self.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use guardchat_llm::{SessionId, TurnId};

    use super::*;
    use crate::test_support::{Ending, ScriptedProvider, Step};

    fn target(turn: u64) -> StreamTarget {
        StreamTarget::new(SessionId::new(1), TurnId::new(turn))
    }

    async fn run(
        provider: &ScriptedProvider,
        think_mode: bool,
        transcript: &mut Transcript,
    ) -> Vec<String> {
        let config = SessionConfig::new("model", think_mode);
        let mut turn = start_turn(provider, &config, target(1), transcript, "Capital?").unwrap();

        let mut snapshots = Vec::new();
        while let Some(snapshot) = turn.next_snapshot().await {
            let snapshot = snapshot.unwrap();
            snapshots.push(snapshot.last().unwrap().assistant_text.clone());
        }
        snapshots
    }

    #[tokio::test]
    async fn single_fragment_becomes_the_answer() {
        let provider = ScriptedProvider::fragments(&["Hello"]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["Hello"]);
        let turn = transcript.last().unwrap();
        assert_eq!(turn.assistant_text, "Hello");
        assert_eq!(turn.status, TurnStatus::Done);
    }

    #[tokio::test]
    async fn reasoning_is_hidden_when_think_mode_is_on() {
        let provider = ScriptedProvider::fragments(&["<think>", "secret", "</think>", "Paris"]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["Paris"]);
        assert_eq!(transcript.last().unwrap().assistant_text, "Paris");
    }

    #[tokio::test]
    async fn markers_leak_when_think_mode_is_off() {
        let provider = ScriptedProvider::fragments(&["<think>", "secret", "</think>", "Paris"]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, false, &mut transcript).await;

        assert_eq!(snapshots.len(), 4);
        assert_eq!(
            transcript.last().unwrap().assistant_text,
            "<think>secret</think>Paris"
        );
    }

    #[tokio::test]
    async fn text_around_a_segment_is_kept_and_snapshots_grow_monotonically() {
        let provider = ScriptedProvider::fragments(&[
            "The ",
            "",
            "<think>",
            "hmm",
            "</think>",
            "capital ",
            "is Paris.",
        ]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["The ", "The capital ", "The capital is Paris."]);
    }

    #[tokio::test]
    async fn unterminated_segment_keeps_text_before_the_marker() {
        let provider = ScriptedProvider::fragments(&["Before", "<think>", "never closed"]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["Before"]);
        let turn = transcript.last().unwrap();
        assert_eq!(turn.assistant_text, "Before");
        assert_eq!(turn.status, TurnStatus::Done);
    }

    #[tokio::test]
    async fn reasoning_channel_never_reaches_the_answer() {
        let provider = ScriptedProvider::new(vec![
            Step::reasoning("weighing options"),
            Step::delta("Paris"),
        ]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["Paris"]);
    }

    #[tokio::test]
    async fn engine_error_preserves_partial_answer() {
        let provider = ScriptedProvider::with_ending(
            vec![Step::delta("Par")],
            Ending::Error("context window exceeded".into()),
        );
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);
        let mut turn = start_turn(&provider, &config, target(1), &mut transcript, "Q").unwrap();

        assert!(turn.next_snapshot().await.unwrap().is_ok());
        let error = match turn.next_snapshot().await {
            Some(Err(error)) => error,
            _ => panic!("expected a generation error"),
        };
        assert!(matches!(error, ChatError::Generation { ref message, .. } if message == "context window exceeded"));
        assert!(turn.next_snapshot().await.is_none());
        drop(turn);

        let last = transcript.last().unwrap();
        assert_eq!(last.assistant_text, "Par");
        assert_eq!(
            last.status,
            TurnStatus::Failed("context window exceeded".into())
        );
    }

    #[tokio::test]
    async fn channel_closing_without_done_is_a_failure() {
        let provider = ScriptedProvider::with_ending(vec![Step::delta("Hel")], Ending::Close);
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);

        let turn = start_turn(&provider, &config, target(1), &mut transcript, "Q").unwrap();
        let result = turn.run_to_end().await;

        assert!(matches!(result, Err(ChatError::StreamClosed { .. })));
        let last = transcript.last().unwrap();
        assert_eq!(last.assistant_text, "Hel");
        assert!(matches!(last.status, TurnStatus::Failed(_)));
    }

    #[tokio::test]
    async fn abort_freezes_the_answer_and_ends_the_sequence() {
        let provider = ScriptedProvider::with_ending(
            vec![Step::delta("Hello"), Step::delta(" world")],
            Ending::Hang,
        );
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);
        let mut turn = start_turn(&provider, &config, target(1), &mut transcript, "Q").unwrap();

        assert!(turn.next_snapshot().await.is_some());
        assert!(turn.abort());
        assert!(!turn.abort());
        assert!(turn.next_snapshot().await.is_none());
        assert_eq!(turn.assistant_text(), "Hello");
        drop(turn);

        let last = transcript.last().unwrap();
        assert_eq!(last.assistant_text, "Hello");
        assert_eq!(last.status, TurnStatus::Aborted);
    }

    #[tokio::test]
    async fn dropping_an_unfinished_turn_aborts_it() {
        let provider = ScriptedProvider::with_ending(vec![Step::delta("Hi")], Ending::Hang);
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);

        let mut turn = start_turn(&provider, &config, target(1), &mut transcript, "Q").unwrap();
        assert!(turn.next_snapshot().await.is_some());
        drop(turn);

        assert_eq!(transcript.last().unwrap().status, TurnStatus::Aborted);
    }

    #[tokio::test]
    async fn stale_events_are_ignored() {
        let provider = ScriptedProvider::new(vec![
            Step::foreign(target(99), "leak"),
            Step::delta("ok"),
        ]);
        let mut transcript = Transcript::new();

        let snapshots = run(&provider, true, &mut transcript).await;

        assert_eq!(snapshots, vec!["ok"]);
    }

    #[tokio::test]
    async fn rejected_request_fails_the_new_turn() {
        let provider = ScriptedProvider::rejecting();
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);

        let result = start_turn(&provider, &config, target(1), &mut transcript, "Q");

        assert!(matches!(result, Err(ChatError::StartGeneration { .. })));
        drop(result);
        assert!(matches!(
            transcript.last().map(|turn| &turn.status),
            Some(TurnStatus::Failed(_))
        ));
    }

    #[tokio::test]
    async fn request_carries_history_and_session_options() {
        let provider = ScriptedProvider::fragments(&["Bye!"]);
        let mut transcript = Transcript::from_turns(vec![crate::transcript::Turn::completed(
            "Hi", "Hello",
        )]);
        let config = SessionConfig::new("qwen3", false)
            .with_temperature(0.6)
            .with_max_tokens(512);

        start_turn(&provider, &config, target(3), &mut transcript, "Bye")
            .unwrap()
            .run_to_end()
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.target, target(3));
        assert_eq!(request.model_id, "qwen3");
        assert_eq!(request.temperature, Some(0.6));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.messages.len(), 4);
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn owned_snapshot_stream_matches_pull_api() {
        let provider = ScriptedProvider::fragments(&["a", "<think>", "x", "</think>", "b"]);
        let mut transcript = Transcript::new();
        let config = SessionConfig::new("model", true);

        let snapshots = start_turn(&provider, &config, target(1), &mut transcript, "Q")
            .unwrap()
            .into_snapshots()
            .map(|snapshot| snapshot.unwrap().last().unwrap().assistant_text.clone())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(snapshots, vec!["a", "ab"]);
        assert_eq!(transcript.last().unwrap().status, TurnStatus::Done);
    }
}
