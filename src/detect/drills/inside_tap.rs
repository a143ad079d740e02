use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::{active_limb_by_proximity, Limb};
use crate::sample::FrameSample;

use super::{ball_of, pick};

/// Inside taps: the ball is passed between the insides of both feet.
///
/// A tap is a ball reversal by the nearer foot, made from below the ball's top
/// edge, by a different foot than the previous tap. Two taps make one rep.
pub struct InsideTapDetector {
    tuning: DrillTuning,
    gate: CooldownGate,
    ball_x: ReversalTracker,
    tally: RepTally,
    last_limb: Option<Limb>,
}

impl InsideTapDetector {
    pub fn new(tuning: DrillTuning) -> Self {
        Self {
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            ball_x: ReversalTracker::default(),
            tally: RepTally::new(DrillType::InsideTap.sub_events_per_rep()),
            last_limb: None,
        }
    }

    pub fn last_limb(&self) -> Option<Limb> {
        self.last_limb
    }
}

impl Default for InsideTapDetector {
    fn default() -> Self {
        Self::new(DrillType::InsideTap.default_tuning())
    }
}

impl DrillDetector for InsideTapDetector {
    fn drill(&self) -> DrillType {
        DrillType::InsideTap
    }

    fn evaluate(&mut self, sample: &FrameSample) -> Evaluation {
        let Some(ball) = ball_of(sample) else {
            return Evaluation::Insufficient;
        };
        let Some((left, right)) = sample.ankles() else {
            return Evaluation::Insufficient;
        };

        let active = active_limb_by_proximity(left.x, right.x, ball.x);
        let ankle = pick(active, left, right);
        let motion = self.ball_x.observe(ball.x);

        let from_below = ankle.y > ball.y - ball.h;
        let triggered = motion.reversed
            && self.last_limb != Some(active)
            && from_below
            && self.gate.is_open(sample.frame_index);

        if triggered {
            self.tally.add();
            self.last_limb = Some(active);
            self.ball_x.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "inside_taps: {} foot at frame {} (count {})",
                active.as_str(),
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
