//! Splits a live fragment stream into reasoning and visible text.
//!
//! Marker detection is a substring check on each fragment in isolation. A
//! marker split across two fragments is not seen, and a fragment carrying a
//! marker is consumed whole, including any text around the marker.

pub const DEFAULT_START_MARKER: &str = "<think>";
pub const DEFAULT_END_MARKER: &str = "</think>";

/// Literal delimiters of a reasoning segment. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningMarkers {
    pub start: String,
    pub end: String,
}

impl ReasoningMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_START_MARKER, DEFAULT_END_MARKER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    #[default]
    Visible,
    Reasoning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentClass {
    Visible,
    Reasoning,
}

/// State change caused by one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTransition {
    /// Start marker seen; this fragment opened a reasoning segment.
    Entered,
    /// Inside a segment, no marker.
    Continued,
    /// End marker seen; this fragment closed the segment.
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub class: FragmentClass,
    pub transition: Option<SegmentTransition>,
}

impl Classified {
    const VISIBLE: Self = Self {
        class: FragmentClass::Visible,
        transition: None,
    };

    const fn reasoning(transition: SegmentTransition) -> Self {
        Self {
            class: FragmentClass::Reasoning,
            transition: Some(transition),
        }
    }
}

/// Two-state machine scoped to one turn's stream.
#[derive(Debug, Clone)]
pub struct Segmenter {
    state: SegmentState,
    reasoning_enabled: bool,
    markers: ReasoningMarkers,
}

impl Segmenter {
    pub fn new(reasoning_enabled: bool, markers: ReasoningMarkers) -> Self {
        Self {
            state: SegmentState::Visible,
            reasoning_enabled,
            markers,
        }
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Classifies one fragment. Empty fragments are dropped and return `None`.
    pub fn classify(&mut self, fragment: &str) -> Option<Classified> {
        if fragment.is_empty() {
            return None;
        }

        let classified = match self.state {
            SegmentState::Visible
                if self.reasoning_enabled && fragment.contains(&self.markers.start) =>
            {
                self.state = SegmentState::Reasoning;
                Classified::reasoning(SegmentTransition::Entered)
            }
            SegmentState::Visible => Classified::VISIBLE,
            SegmentState::Reasoning if fragment.contains(&self.markers.end) => {
                self.state = SegmentState::Visible;
                Classified::reasoning(SegmentTransition::Exited)
            }
            SegmentState::Reasoning => Classified::reasoning(SegmentTransition::Continued),
        };

        Some(classified)
    }
}
