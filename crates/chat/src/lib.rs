#![deny(unsafe_code)]

//! Incremental response processing for a policy-guarded chat.
//!
//! A turn flows through three stages: [`conversation`] turns the transcript
//! into an engine request, [`segmenter`] separates `<think>` reasoning from the
//! visible answer, and [`accumulator`] grows the answer in the transcript.
//! [`processor::TurnStream`] wires them to a live engine stream.

pub mod accumulator;
pub mod config;
pub mod conversation;
pub mod error;
/// SSN refusal policy sent as the system message.
pub mod policy;
pub mod processor;
pub mod segmenter;
pub mod session;
pub mod transcript;

#[cfg(test)]
mod test_support;

pub use accumulator::TranscriptAccumulator;
pub use config::SessionConfig;
pub use conversation::build_request_messages;
pub use error::{ChatError, ChatResult};
pub use processor::{REASONING_LOG_TARGET, TURN_LOG_TARGET, TurnStream, start_turn};
pub use segmenter::{
    Classified, FragmentClass, ReasoningMarkers, SegmentState, SegmentTransition, Segmenter,
};
pub use session::ChatSession;
pub use transcript::{Transcript, Turn, TurnStatus};
