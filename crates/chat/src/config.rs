use crate::policy::{DEFAULT_POLICY_PREAMBLE, system_prompt};
use crate::segmenter::ReasoningMarkers;

/// Immutable per-session configuration, captured once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model_id: String,
    pub policy_preamble: String,
    /// Selects the policy suffix and whether `<think>` segments are hidden.
    pub think_mode: bool,
    pub markers: ReasoningMarkers,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

impl SessionConfig {
    pub fn new(model_id: impl Into<String>, think_mode: bool) -> Self {
        Self {
            model_id: model_id.into(),
            policy_preamble: DEFAULT_POLICY_PREAMBLE.to_string(),
            think_mode,
            markers: ReasoningMarkers::default(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_policy_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.policy_preamble = preamble.into();
        self
    }

    pub fn with_markers(mut self, markers: ReasoningMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Policy preamble with the mode suffix attached.
    pub fn system_prompt(&self) -> String {
        system_prompt(&self.policy_preamble, self.think_mode)
    }
}
