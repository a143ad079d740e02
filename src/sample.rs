//! Per-frame measurement records.
//!
//! The perception side delivers two independent halves per frame: a ball
//! detection and a set of pose keypoints. Both are normalized to `[0, 1]`.
//! Every geometric field is an explicit `Option`; a ball box or keypoint with
//! any missing or non-finite coordinate is "not detected".

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::geometry::{Limb, Point};

pub const R_ANKLE: &str = "r_ankle";
pub const L_ANKLE: &str = "l_ankle";

/// Ball bounding box: normalized center and size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BallBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Builds a box only when all four fields are finite and the size is non-negative.
    pub fn checked(x: f64, y: f64, w: f64, h: f64) -> Option<Self> {
        let finite = [x, y, w, h].iter().all(|v| v.is_finite());
        (finite && w >= 0.0 && h >= 0.0).then_some(Self { x, y, w, h })
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Apparent area; grows as the ball approaches a front-facing camera.
    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBall {
    Tuple([Option<f64>; 4]),
    Fields {
        x: Option<f64>,
        y: Option<f64>,
        w: Option<f64>,
        h: Option<f64>,
    },
}

impl RawBall {
    fn into_box(self) -> Option<BallBox> {
        let [x, y, w, h] = match self {
            RawBall::Tuple(values) => values,
            RawBall::Fields { x, y, w, h } => [x, y, w, h],
        };
        BallBox::checked(x?, y?, w?, h?)
    }
}

fn deserialize_ball<'de, D>(deserializer: D) -> Result<Option<BallBox>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawBall>::deserialize(deserializer)?;
    Ok(raw.and_then(RawBall::into_box))
}

/// Object-detector half of a frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionHalf {
    #[serde(default, deserialize_with = "deserialize_ball")]
    pub ball: Option<BallBox>,
}

impl DetectionHalf {
    pub fn new(ball: Option<BallBox>) -> Self {
        Self { ball }
    }

    pub fn missing() -> Self {
        Self { ball: None }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Pair([Option<f64>; 2]),
    Fields { x: Option<f64>, y: Option<f64> },
}

impl RawPoint {
    fn into_point(self) -> Option<Point> {
        let [x, y] = match self {
            RawPoint::Pair(values) => values,
            RawPoint::Fields { x, y } => [x, y],
        };
        let (x, y) = (x?, y?);
        // The pose estimator zeroes a coordinate it could not locate.
        if x == 0.0 || y == 0.0 {
            return None;
        }
        Point::checked(x, y)
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawPose(BTreeMap<String, Option<RawPoint>>);

/// Pose-estimator half of a frame: joint name to detected position.
///
/// Joints that were not detected are simply absent from the map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPose", into = "BTreeMap<String, Point>")]
pub struct Pose {
    joints: BTreeMap<String, Point>,
}

impl From<RawPose> for Pose {
    fn from(raw: RawPose) -> Self {
        let joints = raw
            .0
            .into_iter()
            .filter_map(|(name, point)| Some((name, point?.into_point()?)))
            .collect();
        Self { joints }
    }
}

impl From<Pose> for BTreeMap<String, Point> {
    fn from(pose: Pose) -> Self {
        pose.joints
    }
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Non-finite coordinates leave the joint absent.
    pub fn with_joint(mut self, name: &str, x: f64, y: f64) -> Self {
        self.insert(name, x, y);
        self
    }

    pub fn with_ankle(self, limb: Limb, x: f64, y: f64) -> Self {
        self.with_joint(ankle_joint(limb), x, y)
    }

    pub fn insert(&mut self, name: &str, x: f64, y: f64) {
        match Point::checked(x, y) {
            Some(point) => {
                self.joints.insert(name.to_string(), point);
            }
            None => {
                self.joints.remove(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.joints.get(name).copied()
    }

    pub fn ankle(&self, limb: Limb) -> Option<Point> {
        self.get(ankle_joint(limb))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

pub fn ankle_joint(limb: Limb) -> &'static str {
    match limb {
        Limb::Left => L_ANKLE,
        Limb::Right => R_ANKLE,
    }
}

/// One frame's merged measurements, as consumed by the detectors.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSample {
    pub frame_index: u64,
    pub ball: Option<BallBox>,
    pub pose: Pose,
}

impl FrameSample {
    pub fn new(frame_index: u64, ball: Option<BallBox>, pose: Pose) -> Self {
        Self {
            frame_index,
            ball,
            pose,
        }
    }

    /// Merge both measurement halves of a frame.
    pub fn merge(frame_index: u64, detection: &DetectionHalf, pose: &Pose) -> Self {
        Self::new(frame_index, detection.ball, pose.clone())
    }

    pub fn ankle(&self, limb: Limb) -> Option<Point> {
        self.pose.ankle(limb)
    }

    /// Both ankles as `(left, right)`, or `None` if either is missing.
    pub fn ankles(&self) -> Option<(Point, Point)> {
        Some((self.ankle(Limb::Left)?, self.ankle(Limb::Right)?))
    }
}
