use serde::{Deserialize, Serialize};

/// Per-frame output of a drill detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResult {
    /// Completed repetitions so far in this session.
    pub count: u32,
    /// A sub-event was accepted on this frame.
    pub triggered: bool,
}

impl TriggerResult {
    /// Reported for frames that could not be evaluated.
    pub const NEUTRAL: TriggerResult = TriggerResult {
        count: 0,
        triggered: false,
    };

    pub fn new(count: u32, triggered: bool) -> Self {
        Self { count, triggered }
    }
}

/// Outcome of feeding one frame to a detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// Ball or a required keypoint was missing. Detector state is untouched.
    Insufficient,
    Scored(TriggerResult),
}

impl Evaluation {
    /// The externally reported `(count, triggered)` pair.
    pub fn result(&self) -> TriggerResult {
        match self {
            Evaluation::Insufficient => TriggerResult::NEUTRAL,
            Evaluation::Scored(result) => *result,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Evaluation::Scored(_))
    }

    pub fn triggered(&self) -> bool {
        self.result().triggered
    }
}
