use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::Limb;
use crate::sample::FrameSample;

use super::ball_of;

/// Which side of the ball the working foot touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapSide {
    In,
    Out,
}

impl TapSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TapSide::In => "in",
            TapSide::Out => "out",
        }
    }

    /// The inside of the left foot faces +x, the inside of the right foot -x.
    fn classify(limb: Limb, ankle_x: f64, ball_x: f64) -> Self {
        let inside = match limb {
            Limb::Left => ankle_x < ball_x,
            Limb::Right => ankle_x > ball_x,
        };
        if inside {
            TapSide::In
        } else {
            TapSide::Out
        }
    }
}

/// Inside-outside taps with one fixed foot.
///
/// Each ball reversal close to the working foot is labelled by which side of
/// the ball the foot is on; the label must alternate between in and out. The
/// right-foot variant also ignores reversals of a near-stationary ball.
pub struct InsideOutsideDetector {
    drill: DrillType,
    limb: Limb,
    /// Minimum `|delta x|` as a fraction of ball width, if any.
    min_motion: Option<f64>,
    tuning: DrillTuning,
    gate: CooldownGate,
    ball_x: ReversalTracker,
    tally: RepTally,
    last_side: Option<TapSide>,
}

impl InsideOutsideDetector {
    pub fn left(tuning: DrillTuning) -> Self {
        Self::new(DrillType::InsideOutsideLeft, Limb::Left, None, tuning)
    }

    pub fn right(tuning: DrillTuning) -> Self {
        Self::new(DrillType::InsideOutsideRight, Limb::Right, Some(1.0 / 40.0), tuning)
    }

    fn new(drill: DrillType, limb: Limb, min_motion: Option<f64>, tuning: DrillTuning) -> Self {
        Self {
            drill,
            limb,
            min_motion,
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            ball_x: ReversalTracker::default(),
            tally: RepTally::new(drill.sub_events_per_rep()),
            last_side: None,
        }
    }

    pub fn last_side(&self) -> Option<TapSide> {
        self.last_side
    }
}

impl DrillDetector for InsideOutsideDetector {
    fn drill(&self) -> DrillType {
        self.drill
    }

    fn evaluate(&mut self, sample: &FrameSample) -> Evaluation {
        let Some(ball) = ball_of(sample) else {
            return Evaluation::Insufficient;
        };
        let Some(ankle) = sample.ankle(self.limb) else {
            return Evaluation::Insufficient;
        };

        let motion = self.ball_x.observe(ball.x);
        let side = TapSide::classify(self.limb, ankle.x, ball.x);
        let close = (ankle.x - ball.x).abs() < ball.w;
        let moving = self
            .min_motion
            .map_or(true, |fraction| motion.delta.abs() > ball.w * fraction);

        let triggered = motion.reversed
            && close
            && moving
            && self.last_side != Some(side)
            && self.gate.is_open(sample.frame_index);

        if triggered {
            self.tally.add();
            self.last_side = Some(side);
            self.ball_x.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "{}: {} tap at frame {} (count {})",
                self.drill,
                side.as_str(),
                sample.frame_index,
                self.tally.completed()
            );
        }

        self.ball_x.advance(ball.x);
        Evaluation::Scored(TriggerResult::new(self.tally.completed(), triggered))
    }

    fn accumulated(&self) -> f64 {
        self.tally.accumulated()
    }

    fn tuning(&self) -> DrillTuning {
        self.tuning
    }
}
