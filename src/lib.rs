//! Drill repetition counter
//!
//! Turns a per-frame stream of ball and foot measurements into repetition
//! counts for soccer ball-control drills (toe taps, push-pulls, V push-pulls,
//! roll-across, inside taps, inside-outside taps).
//!
//! # Architecture
//!
//! Measurements flow one way:
//!
//! 1. Perception workers deliver a ball box (`DetectionHalf`) and pose
//!    keypoints (`Pose`) for each frame, independently and in either order.
//! 2. The session's `PairingBuffer` holds a half until its partner arrives.
//! 3. The merged `FrameSample` goes to the session's `DrillDetector`.
//! 4. The detector returns `(count, triggered)`.
//!
//! Detector state is owned by exactly one session. A missing ball or keypoint
//! never changes that state.
//!
//! # Module Structure
//!
//! - `geometry`: distances, direction signs, active-limb selection
//! - `sample`: measurement records and their JSON forms
//! - `gate`: debounce gate, reversal tracking, rep tally
//! - `drill`: drill identifiers and per-drill constants
//! - `detect`: the detector trait and one detector per drill
//! - `pairing`, `engine`: per-session pairing and dispatch
//! - `config`, `ingest`, `replay`, `api`: the service around the engine

pub mod api;
pub mod config;
pub mod detect;
pub mod drill;
pub mod engine;
pub mod gate;
pub mod geometry;
pub mod ingest;
pub mod pairing;
pub mod replay;
pub mod sample;

pub use detect::{build_detector, default_detector, DrillDetector, Evaluation, TriggerResult};
pub use drill::{DrillTuning, DrillType};
pub use engine::{DrillEngine, DrillSession, FrameOutcome, SessionSummary};
pub use geometry::{Limb, Point};
pub use pairing::PairingBuffer;
pub use sample::{BallBox, DetectionHalf, FrameSample, Pose};
