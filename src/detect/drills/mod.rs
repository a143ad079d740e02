//! One detector per drill.
//!
//! Every detector follows the same shape: validate inputs, derive geometry,
//! evaluate the drill predicate, apply the debounce gate, update state and
//! report `(count, triggered)`.

mod inside_outside;
mod inside_tap;
mod push_pull;
mod push_pull_front;
mod roll_across;
mod toe_tap;
mod v_push_pull;

pub use inside_outside::{InsideOutsideDetector, TapSide};
pub use inside_tap::InsideTapDetector;
pub use push_pull::PushPullDetector;
pub use push_pull_front::{PushPullAction, PushPullFrontDetector};
pub use roll_across::{RollAcrossDetector, RollAction};
pub use toe_tap::ToeTapDetector;
pub use v_push_pull::{VPushPullAction, VPushPullDetector};

use crate::geometry::{Limb, Point};
use crate::sample::{BallBox, FrameSample};

/// Ball box re-validated at the detector boundary.
fn ball_of(sample: &FrameSample) -> Option<BallBox> {
    let ball = sample.ball?;
    BallBox::checked(ball.x, ball.y, ball.w, ball.h)
}

fn pick(limb: Limb, left: Point, right: Point) -> Point {
    match limb {
        Limb::Left => left,
        Limb::Right => right,
    }
}
