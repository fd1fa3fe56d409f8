use std::collections::VecDeque;
use std::sync::Mutex;

use guardchat_llm::{
    BoxFuture, LlmProvider, ModelCatalog, ProviderError, ProviderResult, ProviderStreamHandle,
    ProviderWorker, StreamEventMapped, StreamEventPayload, StreamRequest, StreamTarget,
    make_event_stream,
};

/// One scripted engine event.
pub(crate) enum Step {
    Own(StreamEventPayload),
    Foreign(StreamTarget, StreamEventPayload),
}

impl Step {
    pub(crate) fn delta(text: &str) -> Self {
        Self::Own(StreamEventPayload::Delta(text.to_string()))
    }

    pub(crate) fn reasoning(text: &str) -> Self {
        Self::Own(StreamEventPayload::ReasoningDelta(text.to_string()))
    }

    pub(crate) fn foreign(target: StreamTarget, text: &str) -> Self {
        Self::Foreign(target, StreamEventPayload::Delta(text.to_string()))
    }
}

/// What the scripted worker does after its steps.
pub(crate) enum Ending {
    Done,
    Error(String),
    /// Keep the channel open until cancelled.
    Hang,
    /// Drop the sender without a terminal event.
    Close,
}

struct Script {
    steps: Vec<Step>,
    ending: Ending,
}

/// In-memory engine replaying canned events through the real channel plumbing.
///
/// Each `stream_chat` call consumes the next script; a provider built with
/// [`ScriptedProvider::rejecting`] refuses every request.
pub(crate) struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<StreamRequest>>,
    reject: bool,
}

impl ScriptedProvider {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self::with_ending(steps, Ending::Done)
    }

    pub(crate) fn with_ending(steps: Vec<Step>, ending: Ending) -> Self {
        Self::turns(vec![(steps, ending)])
    }

    pub(crate) fn fragments(fragments: &[&str]) -> Self {
        Self::new(fragments.iter().map(|text| Step::delta(text)).collect())
    }

    pub(crate) fn turns(turns: Vec<(Vec<Step>, Ending)>) -> Self {
        Self {
            scripts: Mutex::new(
                turns
                    .into_iter()
                    .map(|(steps, ending)| Script { steps, ending })
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            reject: false,
        }
    }

    pub(crate) fn rejecting() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub(crate) fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "Scripted engine"
    }

    fn fetch_models<'a>(&'a self) -> BoxFuture<'a, ProviderResult<ModelCatalog>> {
        Box::pin(async move {
            Ok(ModelCatalog::from_static_fallback(
                Vec::new(),
                "scripted".to_string(),
            ))
        })
    }

    fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        if self.reject {
            return Err(ProviderError::EmptyMessageSet {
                stage: "scripted-reject",
                target: request.target,
            });
        }

        let target = request.target;
        self.requests.lock().unwrap().push(request);
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or(Script {
            steps: Vec::new(),
            ending: Ending::Done,
        });

        let (event_tx, stream, cancel_rx) = make_event_stream(target);
        let worker: ProviderWorker = Box::pin(async move {
            for step in script.steps {
                let event = match step {
                    Step::Own(payload) => StreamEventMapped::new(target, payload),
                    Step::Foreign(other, payload) => StreamEventMapped::new(other, payload),
                };
                if event_tx.send(event).is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }

            match script.ending {
                Ending::Done => {
                    let _ = event_tx.send(StreamEventMapped::new(target, StreamEventPayload::Done));
                }
                Ending::Error(message) => {
                    let _ = event_tx.send(StreamEventMapped::new(
                        target,
                        StreamEventPayload::Error(message),
                    ));
                }
                Ending::Hang => {
                    let _ = cancel_rx.await;
                }
                Ending::Close => {}
            }
        });

        Ok(ProviderStreamHandle { stream, worker })
    }
}
