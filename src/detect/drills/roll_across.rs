use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::{active_limb_by_proximity, Limb};
use crate::sample::FrameSample;

use super::{ball_of, pick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollAction {
    LeftRoll,
    LeftCross,
    RightRoll,
    RightCross,
}

impl RollAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollAction::LeftRoll => "lroll",
            RollAction::LeftCross => "lcross",
            RollAction::RightRoll => "rroll",
            RollAction::RightCross => "rcross",
        }
    }

    fn roll(limb: Limb) -> Self {
        match limb {
            Limb::Left => RollAction::LeftRoll,
            Limb::Right => RollAction::RightRoll,
        }
    }

    fn cross(limb: Limb) -> Self {
        match limb {
            Limb::Left => RollAction::LeftCross,
            Limb::Right => RollAction::RightCross,
        }
    }

    fn is_roll(&self) -> bool {
        matches!(self, RollAction::LeftRoll | RollAction::RightRoll)
    }
}

/// Roll-across: the sole rolls the ball sideways, then the feet cross behind it.
///
/// A roll is a ball reversal with the active foot raised above both the
/// ball's half-height line and the other foot, after the ball has travelled
/// more than a ball width since the last accepted event. The cross that
/// follows is the same foot passing the last trigger position while the
/// ankles close to within a ball width. Each foot rolls then crosses; four
/// sub-events make one rep.
pub struct RollAcrossDetector {
    tuning: DrillTuning,
    gate: CooldownGate,
    ball_x: ReversalTracker,
    tally: RepTally,
    last_action: Option<RollAction>,
    /// Ball x at the last roll, or ankle x at the last cross.
    last_trigger_x: f64,
}

impl RollAcrossDetector {
    pub fn new(tuning: DrillTuning) -> Self {
        Self {
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            ball_x: ReversalTracker::default(),
            tally: RepTally::new(DrillType::RollAcross.sub_events_per_rep()),
            last_action: None,
            last_trigger_x: 0.0,
        }
    }

    pub fn last_action(&self) -> Option<RollAction> {
        self.last_action
    }
}

impl Default for RollAcrossDetector {
    fn default() -> Self {
        Self::new(DrillType::RollAcross.default_tuning())
    }
}

impl DrillDetector for RollAcrossDetector {
    fn drill(&self) -> DrillType {
        DrillType::RollAcross
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
        let other = pick(active.opposite(), left, right);
        let motion = self.ball_x.observe(ball.x);
        let line = ball.y - ball.h / 2.0;
        let inter_ankle = (left.x - right.x).abs();

        let roll = RollAction::roll(active);
        let rolled_far = (ball.x - self.last_trigger_x).abs() > ball.w;
        let passed_trigger = match active {
            Limb::Right => ankle.x < self.last_trigger_x,
            Limb::Left => ankle.x > self.last_trigger_x,
        };

        let action = if motion.reversed
            && self.last_action != Some(roll)
            && ankle.y < line
            && ankle.y < other.y
            && rolled_far
        {
            Some(roll)
        } else if passed_trigger && inter_ankle < ball.w && self.last_action == Some(roll) {
            Some(RollAction::cross(active))
        } else {
            None
        };

        let action = action.filter(|_| self.gate.is_open(sample.frame_index));
        let triggered = action.is_some();

        if let Some(action) = action {
            self.last_trigger_x = if action.is_roll() { ball.x } else { ankle.x };
            self.tally.add();
            self.last_action = Some(action);
            self.ball_x.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "roll_across: {} at frame {} (count {})",
                action.as_str(),
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

    fn at(frame: u64, ball_x: f64, left: (f64, f64), right: (f64, f64)) -> FrameSample {
        both_feet(frame, ball(ball_x, 0.6, 0.1, 0.1), left, right)
    }

    #[test]
    fn roll_and_cross_with_each_foot_is_one_rep() {
        let mut det = RollAcrossDetector::default();
        det.evaluate(&at(0, 0.50, (0.3, 0.8), (0.52, 0.50)));

        let r = det.evaluate(&at(1, 0.53, (0.3, 0.8), (0.52, 0.50)));
        assert_eq!(r.result(), TriggerResult::new(0, true));
        assert_eq!(det.last_action(), Some(RollAction::RightRoll));

        assert!(det.evaluate(&at(7, 0.53, (0.45, 0.8), (0.50, 0.8))).triggered());
        assert_eq!(det.last_action(), Some(RollAction::RightCross));

        assert!(det.evaluate(&at(13, 0.62, (0.63, 0.50), (0.3, 0.8))).triggered());
        assert_eq!(det.last_action(), Some(RollAction::LeftRoll));

        let rep = det.evaluate(&at(19, 0.62, (0.63, 0.8), (0.57, 0.8)));
        assert_eq!(rep.result(), TriggerResult::new(1, true));
        assert_eq!(det.last_action(), Some(RollAction::LeftCross));
        assert!((det.accumulated() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_without_roll_is_ignored() {
        let mut det = RollAcrossDetector::default();
        det.evaluate(&at(0, 0.53, (0.45, 0.8), (0.50, 0.8)));
        assert!(!det.evaluate(&at(6, 0.53, (0.45, 0.8), (0.50, 0.8))).triggered());
        assert_eq!(det.last_action(), None);
    }

    #[test]
    fn short_roll_is_ignored() {
        let mut det = RollAcrossDetector::default();
        det.evaluate(&at(0, 0.50, (0.3, 0.8), (0.52, 0.50)));
        assert!(det.evaluate(&at(1, 0.53, (0.3, 0.8), (0.52, 0.50))).triggered());
        det.evaluate(&at(7, 0.53, (0.45, 0.8), (0.50, 0.8)));
        // Left foot rolls but the ball is only 0.05 from the last cross position.
        assert!(!det.evaluate(&at(13, 0.55, (0.56, 0.50), (0.3, 0.8))).triggered());
    }
}
