mod detector;
pub mod drills;
mod result;

pub use detector::DrillDetector;
pub use result::{Evaluation, TriggerResult};

use crate::drill::{DrillTuning, DrillType};
use drills::{
    InsideOutsideDetector, InsideTapDetector, PushPullDetector, PushPullFrontDetector,
    RollAcrossDetector, ToeTapDetector, VPushPullDetector,
};

/// Construct a fresh detector for `drill`.
pub fn build_detector(drill: DrillType, tuning: DrillTuning) -> Box<dyn DrillDetector> {
    match drill {
        DrillType::ToeTap => Box::new(ToeTapDetector::new(tuning)),
        DrillType::PushPull => Box::new(PushPullDetector::new(tuning)),
        DrillType::PushPullLeft => Box::new(PushPullFrontDetector::left(tuning)),
        DrillType::PushPullRight => Box::new(PushPullFrontDetector::right(tuning)),
        DrillType::VPushPull => Box::new(VPushPullDetector::new(tuning)),
        DrillType::RollAcross => Box::new(RollAcrossDetector::new(tuning)),
        DrillType::InsideTap => Box::new(InsideTapDetector::new(tuning)),
        DrillType::InsideOutsideLeft => Box::new(InsideOutsideDetector::left(tuning)),
        DrillType::InsideOutsideRight => Box::new(InsideOutsideDetector::right(tuning)),
    }
}

/// Construct a fresh detector with the drill's default constants.
pub fn default_detector(drill: DrillType) -> Box<dyn DrillDetector> {
    build_detector(drill, drill.default_tuning())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_covers_every_drill() {
        for drill in DrillType::ALL {
            let detector = default_detector(drill);
            assert_eq!(detector.drill(), drill);
            assert_eq!(detector.tuning(), drill.default_tuning());
            assert_eq!(detector.accumulated(), 0.0);
        }
    }
}
