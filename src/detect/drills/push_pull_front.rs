use crate::detect::detector::DrillDetector;
use crate::detect::result::{Evaluation, TriggerResult};
use crate::drill::{DrillTuning, DrillType};
use crate::gate::{CooldownGate, RepTally, ReversalTracker};
use crate::geometry::Limb;
use crate::sample::FrameSample;

use super::ball_of;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushPullAction {
    Push,
    Pull,
}

impl PushPullAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushPullAction::Push => "push",
            PushPullAction::Pull => "pull",
        }
    }
}

/// Single-foot push-pulls filmed from the front.
///
/// Toward/away motion shows up as the ball's apparent area growing or
/// shrinking, so a sub-event is a reversal of the area trend. The ankle's
/// height relative to a line on the ball labels it push (below the line) or
/// pull (above). Labels must alternate.
pub struct PushPullFrontDetector {
    drill: DrillType,
    limb: Limb,
    /// Line sits at `ball_y - line_fraction * ball_h`.
    line_fraction: f64,
    tuning: DrillTuning,
    gate: CooldownGate,
    area: ReversalTracker,
    tally: RepTally,
    last_action: Option<PushPullAction>,
}

impl PushPullFrontDetector {
    pub fn left(tuning: DrillTuning) -> Self {
        Self::new(DrillType::PushPullLeft, Limb::Left, 0.5, tuning)
    }

    pub fn right(tuning: DrillTuning) -> Self {
        Self::new(DrillType::PushPullRight, Limb::Right, 0.75, tuning)
    }

    fn new(drill: DrillType, limb: Limb, line_fraction: f64, tuning: DrillTuning) -> Self {
        Self {
            drill,
            limb,
            line_fraction,
            tuning,
            gate: CooldownGate::new(tuning.cooldown_frames),
            area: ReversalTracker::default(),
            tally: RepTally::new(drill.sub_events_per_rep()),
            last_action: None,
        }
    }

    pub fn last_action(&self) -> Option<PushPullAction> {
        self.last_action
    }
}

impl DrillDetector for PushPullFrontDetector {
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

        let area = ball.area();
        let motion = self.area.observe(area);
        let line = ball.y - self.line_fraction * ball.h;
        let action = if ankle.y > line {
            Some(PushPullAction::Push)
        } else if ankle.y < line {
            Some(PushPullAction::Pull)
        } else {
            None
        };

        let triggered = motion.reversed
            && action.is_some()
            && action != self.last_action
            && self.gate.is_open(sample.frame_index);

        if triggered {
            self.tally.add();
            self.last_action = action;
            self.area.commit(motion.direction);
            self.gate.record(sample.frame_index);
            log::debug!(
                "{}: {} at frame {} (count {})",
                self.drill,
                action.map(|a| a.as_str()).unwrap_or("-"),
                sample.frame_index,
                self.tally.completed()
            );
        }

        self.area.advance(area);
        Evaluation::Scored(TriggerResult::new(self.tally.completed(), triggered))
    }

    fn accumulated(&self) -> f64 {
        self.tally.accumulated()
    }

    fn tuning(&self) -> DrillTuning {
        self.tuning
    }
}
