use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::CooldownGate;
use crate::geometry::{active_limb_by_height, distance, proximity_threshold, Limb, Point};
use crate::sample::FrameSample;

use super::{ball_of, pick};

/// Toe taps (side view): the raised foot comes down onto the top of the ball.
///
/// A tap is accepted when the active foot is descending, within proximity of
/// the ball center, still above the ball, and is not the foot that tapped
/// last. Taps are tallied per foot; one repetition is one tap with each foot.
pub struct ToeTapDetector {
    tuning: DrillTuning,
    gate: CooldownGate,
    previous: Option<(Point, Point)>,
    last_limb: Option<Limb>,
    left_taps: u32,
    right_taps: u32,
}

impl ToeTapDetector {
    pub fn new(tuning: DrillTuning) -> Self {
        Self {
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            previous: None,
            last_limb: None,
            left_taps: 0,
            right_taps: 0,
        }
    }

    pub fn taps(&self, limb: Limb) -> u32 {
        match limb {
            Limb::Left => self.left_taps,
            Limb::Right => self.right_taps,
        }
    }

    fn count(&self) -> u32 {
        self.left_taps.min(self.right_taps)
    }
}

impl Default for ToeTapDetector {
    fn default() -> Self {
        Self::new(DrillType::ToeTap.default_tuning())
    }
}

impl DrillDetector for ToeTapDetector {
    fn drill(&self) -> DrillType {
        DrillType::ToeTap
    }

    fn evaluate(&mut self, sample: &FrameSample) -> Evaluation {
        let Some(ball) = ball_of(sample) else {
            return Evaluation::Insufficient;
        };
        let Some((left, right)) = sample.ankles() else {
            return Evaluation::Insufficient;
        };

        let threshold = proximity_threshold(ball.w, ball.h, self.tuning.proximity_factor_or(0.90));
        let active = active_limb_by_height(left.y, right.y);
        let ankle = pick(active, left, right);
        let (prev_left, prev_right) = self.previous.unwrap_or((left, right));
        let prev_y = pick(active, prev_left, prev_right).y;

        let near = distance(Some(ankle), Some(ball.center())).is_some_and(|d| d <= threshold);
        let descending = ankle.y > prev_y;
        let above_ball = ankle.y < ball.y;
        let triggered = near
            && descending
            && above_ball
            && self.last_limb != Some(active)
            && self.gate.is_open(sample.frame_index);

        if triggered {
            match active {
                Limb::Left => self.left_taps += 1,
                Limb::Right => self.right_taps += 1,
            }
            self.last_limb = Some(active);
            self.gate.record(sample.frame_index);
            log::debug!(
                "toe_taps: {} tap at frame {} (left={}, right={})",
                active.as_str(),
                sample.frame_index,
                self.left_taps,
                self.right_taps
            );
        }

        self.previous = Some((left, right));
        Evaluation::Scored(TriggerResult::new(self.count(), triggered))
    }

    fn accumulated(&self) -> f64 {
        f64::from(self.left_taps + self.right_taps) / 2.0
    }

    fn tuning(&self) -> DrillTuning {
        self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::drills::fixtures::{ball, both_feet};

    fn ball_at_center() -> Option<crate::sample::BallBox> {
        ball(0.5, 0.5, 0.1, 0.1)
    }

    #[test]
    fn one_tap_per_foot_makes_a_rep() {
        let mut det = ToeTapDetector::default();
        let right_down = (0.6, 0.8);

        // Left foot rises, then comes down onto the ball.
        let r0 = det.evaluate(&both_feet(0, ball_at_center(), (0.5, 0.45), right_down));
        let r1 = det.evaluate(&both_feet(1, ball_at_center(), (0.5, 0.40), right_down));
        let r2 = det.evaluate(&both_feet(2, ball_at_center(), (0.5, 0.44), right_down));
        assert_eq!(r0.result(), TriggerResult::NEUTRAL);
        assert_eq!(r1.result(), TriggerResult::NEUTRAL);
        assert_eq!(r2.result(), TriggerResult::new(0, true));
        assert_eq!(det.taps(Limb::Left), 1);

        // Swap feet: right rises and taps.
        det.evaluate(&both_feet(15, ball_at_center(), (0.45, 0.8), (0.55, 0.40)));
        let r = det.evaluate(&both_feet(16, ball_at_center(), (0.45, 0.8), (0.55, 0.44)));
        assert_eq!(r.result(), TriggerResult::new(1, true));
    }

    #[test]
    fn same_foot_twice_is_not_counted() {
        let mut det = ToeTapDetector::default();
        let right_down = (0.6, 0.8);
        det.evaluate(&both_feet(0, ball_at_center(), (0.5, 0.40), right_down));
        assert!(det
            .evaluate(&both_feet(1, ball_at_center(), (0.5, 0.44), right_down))
            .triggered());
        det.evaluate(&both_feet(20, ball_at_center(), (0.5, 0.40), right_down));
        let again = det.evaluate(&both_feet(21, ball_at_center(), (0.5, 0.44), right_down));
        assert!(!again.triggered());
        assert_eq!(det.taps(Limb::Left), 1);
    }

    #[test]
    fn second_foot_inside_window_is_rejected() {
        let mut det = ToeTapDetector::default();
        det.evaluate(&both_feet(0, ball_at_center(), (0.5, 0.40), (0.6, 0.8)));
        assert!(det
            .evaluate(&both_feet(1, ball_at_center(), (0.5, 0.44), (0.6, 0.8)))
            .triggered());

        det.evaluate(&both_feet(5, ball_at_center(), (0.45, 0.8), (0.55, 0.40)));
        let early = det.evaluate(&both_feet(6, ball_at_center(), (0.45, 0.8), (0.55, 0.44)));
        assert!(!early.triggered());
        assert_eq!(det.taps(Limb::Right), 0);
    }

    #[test]
    fn foot_far_from_ball_does_not_tap() {
        let mut det = ToeTapDetector::default();
        det.evaluate(&both_feet(0, ball_at_center(), (0.1, 0.20), (0.9, 0.8)));
        let r = det.evaluate(&both_feet(1, ball_at_center(), (0.1, 0.25), (0.9, 0.8)));
        assert!(!r.triggered());
    }

    #[test]
    fn missing_ankle_leaves_state_untouched() {
        let mut det = ToeTapDetector::default();
        det.evaluate(&both_feet(0, ball_at_center(), (0.5, 0.40), (0.6, 0.8)));
        let dropped = crate::detect::drills::fixtures::one_foot(
            1,
            ball_at_center(),
            Limb::Left,
            (0.5, 0.1),
        );
        assert_eq!(det.evaluate(&dropped), Evaluation::Insufficient);
        // Previous left y is still 0.40, so this frame is a descent.
        let r = det.evaluate(&both_feet(2, ball_at_center(), (0.5, 0.44), (0.6, 0.8)));
        assert!(r.triggered());
    }
}
