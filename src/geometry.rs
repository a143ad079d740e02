//! Geometry primitives shared by every drill detector.
//!
//! All coordinates are normalized to `[0, 1]` with `y` growing downward, so a
//! smaller `y` means a physically higher point.

use serde::{Deserialize, Serialize};

/// A normalized 2D point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds a point only when both coordinates are finite.
    pub fn checked(x: f64, y: f64) -> Option<Self> {
        (x.is_finite() && y.is_finite()).then_some(Self { x, y })
    }
}

/// Which foot a predicate is evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    Left,
    Right,
}

impl Limb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Limb::Left => "left",
            Limb::Right => "right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Limb::Left => Limb::Right,
            Limb::Right => Limb::Left,
        }
    }
}

/// Sign of a horizontal (or area) change relative to the previous sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Euclidean distance between two points. `None` when either point is missing.
pub fn distance(p: Option<Point>, q: Option<Point>) -> Option<f64> {
    let (p, q) = (p?, q?);
    let d = ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt();
    d.is_finite().then_some(d)
}

/// Strictly-greater comparison: ties resolve to `Decreasing`.
pub fn direction(current: f64, previous: f64) -> Direction {
    if current > previous {
        Direction::Increasing
    } else {
        Direction::Decreasing
    }
}

/// Ball-size scaled "touching" distance.
pub fn proximity_threshold(ball_w: f64, ball_h: f64, k: f64) -> f64 {
    k * (ball_w + ball_h)
}

/// The raised foot (smaller `y`) is active. Ties go to the right foot.
pub fn active_limb_by_height(l_ankle_y: f64, r_ankle_y: f64) -> Limb {
    if l_ankle_y < r_ankle_y {
        Limb::Left
    } else {
        Limb::Right
    }
}

/// The foot horizontally nearer the ball is active. Ties go to the right foot.
pub fn active_limb_by_proximity(l_ankle_x: f64, r_ankle_x: f64, ball_x: f64) -> Limb {
    if (l_ankle_x - ball_x).abs() < (r_ankle_x - ball_x).abs() {
        Limb::Left
    } else {
        Limb::Right
    }
}
