use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::{active_limb_by_proximity, Limb};
use crate::sample::FrameSample;

use super::{ball_of, pick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VPushPullAction {
    LeftPull,
    LeftPush,
    RightPull,
    RightPush,
}

impl VPushPullAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VPushPullAction::LeftPull => "lpull",
            VPushPullAction::LeftPush => "lpush",
            VPushPullAction::RightPull => "rpull",
            VPushPullAction::RightPush => "rpush",
        }
    }

    fn pull(limb: Limb) -> Self {
        match limb {
            Limb::Left => VPushPullAction::LeftPull,
            Limb::Right => VPushPullAction::RightPull,
        }
    }

    fn push(limb: Limb) -> Self {
        match limb {
            Limb::Left => VPushPullAction::LeftPush,
            Limb::Right => VPushPullAction::RightPush,
        }
    }
}

/// V push-pulls: each foot pulls the ball back and pushes it out diagonally.
///
/// The foot nearer the ball is active. A pull is a ball reversal with the
/// foot above the ball's half-height line; the push that follows needs only
/// the same foot back below the line. Four sub-events make one rep and no
/// label may repeat back to back.
pub struct VPushPullDetector {
    tuning: DrillTuning,
    gate: CooldownGate,
    ball_x: ReversalTracker,
    tally: RepTally,
    last_action: Option<VPushPullAction>,
}

impl VPushPullDetector {
    pub fn new(tuning: DrillTuning) -> Self {
        Self {
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            ball_x: ReversalTracker::default(),
            tally: RepTally::new(DrillType::VPushPull.sub_events_per_rep()),
            last_action: None,
        }
    }

    pub fn last_action(&self) -> Option<VPushPullAction> {
        self.last_action
    }
}

impl Default for VPushPullDetector {
    fn default() -> Self {
        Self::new(DrillType::VPushPull.default_tuning())
    }
}

impl DrillDetector for VPushPullDetector {
    fn drill(&self) -> DrillType {
        DrillType::VPushPull
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
        let line = ball.y - ball.h / 2.0;

        let pull = VPushPullAction::pull(active);
        let action = if motion.reversed && ankle.y < line {
            Some(pull)
        } else if self.last_action == Some(pull) && ankle.y > line {
            Some(VPushPullAction::push(active))
        } else {
            None
        };

        let triggered = action.is_some()
            && action != self.last_action
            && self.gate.is_open(sample.frame_index);

        if triggered {
            self.tally.add();
            self.last_action = action;
            self.ball_x.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "v_push_pull: {} at frame {} (count {})",
                action.map(|a| a.as_str()).unwrap_or("-"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::drills::fixtures::{ball, both_feet};

    fn left_working(frame: u64, ball_x: f64, ankle_y: f64) -> FrameSample {
        both_feet(frame, ball(ball_x, 0.6, 0.1, 0.1), (0.48, ankle_y), (0.7, 0.8))
    }

    fn right_working(frame: u64, ball_x: f64, ankle_y: f64) -> FrameSample {
        both_feet(frame, ball(ball_x, 0.6, 0.1, 0.1), (0.3, 0.8), (0.53, ankle_y))
    }

    #[test]
    fn four_actions_make_one_rep() {
        let mut det = VPushPullDetector::default();
        det.evaluate(&left_working(0, 0.50, 0.60));

        assert!(det.evaluate(&left_working(1, 0.52, 0.50)).triggered());
        assert_eq!(det.last_action(), Some(VPushPullAction::LeftPull));

        assert!(det.evaluate(&left_working(7, 0.52, 0.60)).triggered());
        assert_eq!(det.last_action(), Some(VPushPullAction::LeftPush));

        assert!(det.evaluate(&right_working(13, 0.55, 0.50)).triggered());
        assert_eq!(det.last_action(), Some(VPushPullAction::RightPull));

        let rep = det.evaluate(&right_working(19, 0.55, 0.60));
        assert_eq!(rep.result(), TriggerResult::new(1, true));
        assert_eq!(det.last_action(), Some(VPushPullAction::RightPush));
    }

    #[test]
    fn repeated_pull_is_rejected() {
        let mut det = VPushPullDetector::default();
        det.evaluate(&left_working(0, 0.50, 0.60));
        assert!(det.evaluate(&left_working(1, 0.52, 0.50)).triggered());
        // Reverses again with the foot still raised: another pull, not counted.
        assert!(!det.evaluate(&left_working(10, 0.49, 0.50)).triggered());
        assert_eq!(det.tally.sub_events(), 1);
    }

    #[test]
    fn push_requires_preceding_pull() {
        let mut det = VPushPullDetector::default();
        det.evaluate(&left_working(0, 0.50, 0.50));
        assert!(!det.evaluate(&left_working(1, 0.50, 0.60)).triggered());
        assert_eq!(det.last_action(), None);
    }
}
