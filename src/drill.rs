//! Drill identifiers and per-drill tuning.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported drills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrillType {
    #[serde(rename = "toe_taps")]
    ToeTap,
    #[serde(rename = "push_pull")]
    PushPull,
    #[serde(rename = "push_pull_left")]
    PushPullLeft,
    #[serde(rename = "push_pull_right")]
    PushPullRight,
    #[serde(rename = "v_push_pull")]
    VPushPull,
    #[serde(rename = "roll_across")]
    RollAcross,
    #[serde(rename = "inside_taps")]
    InsideTap,
    #[serde(rename = "inside_outside_left")]
    InsideOutsideLeft,
    #[serde(rename = "inside_outside_right")]
    InsideOutsideRight,
}

impl DrillType {
    pub const ALL: [DrillType; 9] = [
        DrillType::ToeTap,
        DrillType::PushPull,
        DrillType::PushPullLeft,
        DrillType::PushPullRight,
        DrillType::VPushPull,
        DrillType::RollAcross,
        DrillType::InsideTap,
        DrillType::InsideOutsideLeft,
        DrillType::InsideOutsideRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrillType::ToeTap => "toe_taps",
            DrillType::PushPull => "push_pull",
            DrillType::PushPullLeft => "push_pull_left",
            DrillType::PushPullRight => "push_pull_right",
            DrillType::VPushPull => "v_push_pull",
            DrillType::RollAcross => "roll_across",
            DrillType::InsideTap => "inside_taps",
            DrillType::InsideOutsideLeft => "inside_outside_left",
            DrillType::InsideOutsideRight => "inside_outside_right",
        }
    }

    /// Accepted sub-events that make up one reported repetition.
    ///
    /// Toe taps are tallied per foot instead; see the toe tap detector.
    pub fn sub_events_per_rep(&self) -> u32 {
        match self {
            DrillType::ToeTap => 1,
            DrillType::VPushPull | DrillType::RollAcross => 4,
            _ => 2,
        }
    }

    pub fn default_tuning(&self) -> DrillTuning {
        match self {
            DrillType::ToeTap => DrillTuning::new(12, Some(0.90)),
            DrillType::PushPull => DrillTuning::new(12, Some(0.70)),
            DrillType::PushPullLeft | DrillType::PushPullRight => DrillTuning::new(12, None),
            DrillType::VPushPull
            | DrillType::RollAcross
            | DrillType::InsideTap
            | DrillType::InsideOutsideLeft
            | DrillType::InsideOutsideRight => DrillTuning::new(6, None),
        }
    }
}

impl fmt::Display for DrillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrillType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        DrillType::ALL
            .into_iter()
            .find(|drill| drill.as_str() == value)
            .ok_or_else(|| anyhow!("unknown drill type '{}'", value))
    }
}

/// Detector constants that vary per drill.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrillTuning {
    /// Debounce window in frames.
    pub cooldown_frames: u64,
    /// `k` in `k * (ball_w + ball_h)`, for drills with a foot-to-ball proximity test.
    pub proximity_factor: Option<f64>,
}

impl DrillTuning {
    pub fn new(cooldown_frames: u64, proximity_factor: Option<f64>) -> Self {
        Self {
            cooldown_frames,
            proximity_factor,
        }
    }

    pub(crate) fn proximity_factor_or(&self, fallback: f64) -> f64 {
        self.proximity_factor.unwrap_or(fallback)
    }
}
