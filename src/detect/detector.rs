use crate::detect::result::Evaluation;
use crate::drill::{DrillTuning, DrillType};
use crate::sample::FrameSample;

/// A stateful per-drill repetition detector.
///
/// Each instance exclusively owns the state of one drill session. Evaluation
/// is synchronous and infallible: a frame without the measurements a drill
/// needs yields `Evaluation::Insufficient` and leaves the state unchanged.
///
/// Callers must feed frames in non-decreasing `frame_index` order and must not
/// share an instance between sessions.
pub trait DrillDetector: Send {
    /// Drill this detector counts.
    fn drill(&self) -> DrillType;

    /// Feed one merged frame sample.
    fn evaluate(&mut self, sample: &FrameSample) -> Evaluation;

    /// Running tally including partially completed repetitions.
    fn accumulated(&self) -> f64;

    /// Constants in effect for this instance.
    fn tuning(&self) -> DrillTuning;
}
