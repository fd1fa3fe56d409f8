use guardchat_llm::{ProviderError, StreamTarget};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("failed to start generation on `{stage}`, {source}"))]
    StartGeneration {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("generation failed for {target:?}: {message}"))]
    Generation {
        stage: &'static str,
        target: StreamTarget,
        message: String,
    },
    #[snafu(display("engine stream for {target:?} ended before a terminal event"))]
    StreamClosed {
        stage: &'static str,
        target: StreamTarget,
    },
    #[snafu(display("transcript has no streaming turn on `{stage}`"))]
    NoInFlightTurn { stage: &'static str },
}

pub type ChatResult<T> = Result<T, ChatError>;
