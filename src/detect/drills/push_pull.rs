use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::{active_limb_by_height, distance, proximity_threshold};
use crate::sample::FrameSample;

use super::{ball_of, pick};

/// Push-pulls (side view): the sole rolls the ball forward and back.
///
/// A sub-event is a reversal of the ball's horizontal direction while the
/// raised foot is within proximity of the ball. A push and a pull make one rep.
pub struct PushPullDetector {
    tuning: DrillTuning,
    gate: CooldownGate,
    ball_x: ReversalTracker,
    tally: RepTally,
}

impl PushPullDetector {
    pub fn new(tuning: DrillTuning) -> Self {
        Self {
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            ball_x: ReversalTracker::default(),
            tally: RepTally::new(DrillType::PushPull.sub_events_per_rep()),
        }
    }
}

impl Default for PushPullDetector {
    fn default() -> Self {
        Self::new(DrillType::PushPull.default_tuning())
    }
}

impl DrillDetector for PushPullDetector {
    fn drill(&self) -> DrillType {
        DrillType::PushPull
    }

    fn evaluate(&mut self, sample: &FrameSample) -> Evaluation {
        let Some(ball) = ball_of(sample) else {
            return Evaluation::Insufficient;
        };
        let Some((left, right)) = sample.ankles() else {
            return Evaluation::Insufficient;
        };

        let threshold = proximity_threshold(ball.w, ball.h, self.tuning.proximity_factor_or(0.70));
        let active = active_limb_by_height(left.y, right.y);
        let ankle = pick(active, left, right);
        let motion = self.ball_x.observe(ball.x);

        let near = distance(Some(ankle), Some(ball.center())).is_some_and(|d| d <= threshold);
        let triggered = motion.reversed && near && self.gate.is_open(sample.frame_index);

        if triggered {
            self.tally.add();
            self.ball_x.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "push_pull: {} foot reversal at frame {} (count {})",
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
