use guardchat_llm::ProviderMessage;

use crate::config::SessionConfig;
use crate::transcript::{Transcript, Turn};

/// Builds the engine request for a new user message and opens its turn.
///
/// The request is: the system prompt, one user/assistant pair per finished
/// prior turn, then `message`. Afterwards `transcript` ends with a streaming
/// turn holding `message` and an empty answer.
pub fn build_request_messages(
    config: &SessionConfig,
    transcript: &mut Transcript,
    message: &str,
) -> Vec<ProviderMessage> {
    let history = transcript
        .turns()
        .iter()
        .filter(|turn| turn.status.is_final());

    let mut messages = Vec::with_capacity(transcript.len() * 2 + 2);
    messages.push(ProviderMessage::system(config.system_prompt()));
    for turn in history {
        messages.push(ProviderMessage::user(turn.user_text.clone()));
        messages.push(ProviderMessage::assistant(turn.assistant_text.clone()));
    }
    messages.push(ProviderMessage::user(message));

    transcript.push(Turn::pending(message));
    messages
}
