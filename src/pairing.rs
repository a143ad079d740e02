//! Measurement pairing.
//!
//! The object detector and the pose estimator finish each frame
//! independently and in either order. `PairingBuffer` holds whichever half
//! arrived first until its partner shows up, then hands back the merged
//! `FrameSample`.
//!
//! Two bounds keep a stalled producer from growing the buffer forever:
//! - entries older than the pairing timeout are dropped (`expire`)
//! - at capacity the lowest frame index is evicted first, which may be the
//!   incoming half itself
//!
//! A dropped frame is never evaluated, which is the same as both halves
//! being missing.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::sample::{DetectionHalf, FrameSample, Pose};

pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 64;

#[derive(Debug)]
struct PendingFrame {
    detection: Option<DetectionHalf>,
    pose: Option<Pose>,
    first_seen: Instant,
}

/// Per-session buffer of half-complete frames keyed by frame index.
#[derive(Debug)]
pub struct PairingBuffer {
    pending: BTreeMap<u64, PendingFrame>,
    timeout: Duration,
    max_frames: usize,
}

impl PairingBuffer {
    pub fn new(timeout: Duration, max_frames: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            timeout,
            max_frames: max_frames.max(1),
        }
    }

    /// Offer one or both halves of `frame_index`.
    ///
    /// Returns the merged sample once both halves are present; the entry is
    /// then removed. A half that arrives twice replaces the earlier copy.
    pub fn submit(
        &mut self,
        frame_index: u64,
        detection: Option<DetectionHalf>,
        pose: Option<Pose>,
        now: Instant,
    ) -> Option<FrameSample> {
        self.expire(now);

        let entry = self.pending.remove(&frame_index);
        let (mut held_detection, mut held_pose, first_seen) = match entry {
            Some(entry) => (entry.detection, entry.pose, entry.first_seen),
            None => (None, None, now),
        };
        if detection.is_some() {
            held_detection = detection;
        }
        if pose.is_some() {
            held_pose = pose;
        }

        match (&held_detection, &held_pose) {
            (Some(detection), Some(pose)) => {
                return Some(FrameSample::merge(frame_index, detection, pose));
            }
            (None, None) => return None,
            _ => {}
        }

        if self.pending.len() >= self.max_frames {
            if let Some((&oldest, _)) = self.pending.first_key_value() {
                if frame_index < oldest {
                    log::warn!(
                        "pairing buffer full ({} frames), dropping frame {}",
                        self.max_frames,
                        frame_index
                    );
                    return None;
                }
            }
        }
        while self.pending.len() >= self.max_frames {
            if let Some((evicted, _)) = self.pending.pop_first() {
                log::warn!(
                    "pairing buffer full ({} frames), dropping frame {}",
                    self.max_frames,
                    evicted
                );
            }
        }

        self.pending.insert(
            frame_index,
            PendingFrame {
                detection: held_detection,
                pose: held_pose,
                first_seen,
            },
        );
        None
    }

    /// Drop entries that waited longer than the timeout. Returns how many.
    pub fn expire(&mut self, now: Instant) -> usize {
        let timeout = self.timeout;
        let before = self.pending.len();
        self.pending.retain(|frame_index, entry| {
            let waited = now.saturating_duration_since(entry.first_seen);
            let keep = waited <= timeout;
            if !keep {
                log::warn!(
                    "frame {} timed out waiting for its {} half after {:?}",
                    frame_index,
                    if entry.detection.is_none() { "detection" } else { "pose" },
                    waited
                );
            }
            keep
        });
        before - self.pending.len()
    }

    pub fn is_pending(&self, frame_index: u64) -> bool {
        self.pending.contains_key(&frame_index)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every entry below `frame_index`. Returns how many.
    pub fn discard_before(&mut self, frame_index: u64) -> usize {
        let kept = self.pending.split_off(&frame_index);
        let dropped = std::mem::replace(&mut self.pending, kept);
        for stale in dropped.keys() {
            log::warn!(
                "frame {} can no longer be evaluated after frame {}, dropping it",
                stale,
                frame_index
            );
        }
        dropped.len()
    }
}

impl Default for PairingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PAIRING_TIMEOUT, DEFAULT_MAX_PENDING_FRAMES)
    }
}
