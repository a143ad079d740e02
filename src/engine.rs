//! Drill engine: routes each session's measurements to that session's detector.
//!
//! Sessions are created lazily on first use and own everything stateful: the
//! detector for the active drill and the pairing buffer. Nothing is shared
//! between sessions, so different sessions may be driven from different
//! threads. Calls for the same session are serialized by its lock.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::detect::{build_detector, DrillDetector, TriggerResult};
use crate::drill::DrillType;
use crate::pairing::PairingBuffer;
use crate::sample::{DetectionHalf, Pose};

/// Session ids are local, opaque and short: `[A-Za-z0-9_-]{1,64}`.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    static SESSION_ID_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = SESSION_ID_RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("session id pattern is valid")
    });
    if !re.is_match(session_id) {
        return Err(anyhow!("session id must match ^[A-Za-z0-9_-]{{1,64}}$"));
    }
    Ok(())
}

/// What happened to one submitted measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The other half of the frame has not arrived yet.
    Pending,
    /// The frame completed after a later frame was evaluated and was dropped.
    Stale,
    /// The drill identifier is not one we count. No state was created.
    UnknownDrill,
    Evaluated(TriggerResult),
}

impl FrameOutcome {
    pub fn result(&self) -> TriggerResult {
        match self {
            FrameOutcome::Evaluated(result) => *result,
            FrameOutcome::Pending | FrameOutcome::Stale | FrameOutcome::UnknownDrill => {
                TriggerResult::NEUTRAL
            }
        }
    }
}

/// Point-in-time view of a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub drill: DrillType,
    pub count: u32,
    pub accumulated: f64,
    pub frames_evaluated: u64,
    pub pending_frames: usize,
}

/// One continuous run of a drill.
pub struct DrillSession {
    id: String,
    drill: DrillType,
    detector: Box<dyn DrillDetector>,
    pairing: PairingBuffer,
    last_count: u32,
    frames_evaluated: u64,
    last_evaluated: Option<u64>,
    last_active: Instant,
}

impl DrillSession {
    fn new(id: &str, drill: DrillType, config: &EngineConfig, now: Instant) -> Self {
        Self {
            id: id.to_string(),
            drill,
            detector: build_detector(drill, config.tuning_for(drill)),
            pairing: PairingBuffer::new(config.pairing_timeout, config.max_pending_frames),
            last_count: 0,
            frames_evaluated: 0,
            last_evaluated: None,
            last_active: now,
        }
    }

    /// Start over with a fresh detector for `drill`. Buffered halves belong to
    /// the previous run and are discarded.
    fn reset(&mut self, drill: DrillType, config: &EngineConfig, now: Instant) {
        log::info!(
            "session {}: drill changed from {} to {}, resetting",
            self.id,
            self.drill,
            drill
        );
        *self = Self::new(&self.id, drill, config, now);
    }

    fn submit(
        &mut self,
        frame_index: u64,
        detection: Option<DetectionHalf>,
        pose: Option<Pose>,
        now: Instant,
    ) -> FrameOutcome {
        self.last_active = now;
        // Detectors only move forward in frame order.
        if let Some(last) = self.last_evaluated.filter(|&last| frame_index < last) {
            log::warn!(
                "session {}: dropping frame {} that arrived after frame {}",
                self.id,
                frame_index,
                last
            );
            return FrameOutcome::Stale;
        }
        let Some(sample) = self.pairing.submit(frame_index, detection, pose, now) else {
            return FrameOutcome::Pending;
        };
        let result = self.detector.evaluate(&sample).result();
        self.frames_evaluated += 1;
        self.last_evaluated = Some(sample.frame_index);
        self.pairing.discard_before(sample.frame_index);
        if result.triggered {
            self.last_count = result.count;
        }
        FrameOutcome::Evaluated(result)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            drill: self.drill,
            count: self.last_count,
            accumulated: self.detector.accumulated(),
            frames_evaluated: self.frames_evaluated,
            pending_frames: self.pairing.len(),
        }
    }
}

/// Thread-safe registry of drill sessions.
pub struct DrillEngine {
    config: EngineConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<DrillSession>>>>,
}

impl DrillEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `frame_index` for a session once both halves are known.
    ///
    /// Returns `(0, false)` while a half is still missing and for unknown
    /// drill identifiers. Halves passed here are buffered, so a later call
    /// carrying only the missing half completes the frame.
    pub fn get_trigger(
        &self,
        session_id: &str,
        drill_id: &str,
        frame_index: u64,
        detection: Option<&DetectionHalf>,
        pose: Option<&Pose>,
    ) -> Result<TriggerResult> {
        let outcome = self.submit(
            session_id,
            drill_id,
            frame_index,
            detection.cloned(),
            pose.cloned(),
        )?;
        Ok(outcome.result())
    }

    pub fn submit(
        &self,
        session_id: &str,
        drill_id: &str,
        frame_index: u64,
        detection: Option<DetectionHalf>,
        pose: Option<Pose>,
    ) -> Result<FrameOutcome> {
        self.submit_at(session_id, drill_id, frame_index, detection, pose, Instant::now())
    }

    /// `submit` with an explicit clock reading for the pairing timeout.
    pub fn submit_at(
        &self,
        session_id: &str,
        drill_id: &str,
        frame_index: u64,
        detection: Option<DetectionHalf>,
        pose: Option<Pose>,
        now: Instant,
    ) -> Result<FrameOutcome> {
        validate_session_id(session_id)?;
        let drill: DrillType = match drill_id.parse() {
            Ok(drill) => drill,
            Err(_) => {
                log::debug!(
                    "session {}: ignoring frame {} for unknown drill '{}'",
                    session_id,
                    frame_index,
                    drill_id
                );
                return Ok(FrameOutcome::UnknownDrill);
            }
        };

        let session = self.session(session_id, drill, now)?;
        let mut session = session
            .lock()
            .map_err(|_| anyhow!("session {} lock poisoned", session_id))?;
        if session.drill != drill {
            session.reset(drill, &self.config, now);
        }
        Ok(session.submit(frame_index, detection, pose, now))
    }

    fn session(
        &self,
        session_id: &str,
        drill: DrillType,
        now: Instant,
    ) -> Result<Arc<Mutex<DrillSession>>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session registry lock poisoned"))?;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            log::info!("session {}: started {}", session_id, drill);
            Arc::new(Mutex::new(DrillSession::new(session_id, drill, &self.config, now)))
        });
        Ok(Arc::clone(session))
    }

    /// Drop a session and all of its state. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> Result<bool> {
        validate_session_id(session_id)?;
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session registry lock poisoned"))?;
        let removed = sessions.remove(session_id).is_some();
        if removed {
            log::info!("session {}: ended", session_id);
        }
        Ok(removed)
    }

    pub fn summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        validate_session_id(session_id)?;
        let session = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| anyhow!("session registry lock poisoned"))?;
            sessions.get(session_id).cloned()
        };
        let Some(session) = session else {
            return Ok(None);
        };
        let session = session
            .lock()
            .map_err(|_| anyhow!("session {} lock poisoned", session_id))?;
        Ok(Some(session.summary()))
    }

    /// Expire stale half-frames across every session. Returns how many were dropped.
    pub fn expire_stale(&self, now: Instant) -> Result<usize> {
        let sessions: Vec<_> = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| anyhow!("session registry lock poisoned"))?;
            sessions.values().cloned().collect()
        };
        let mut dropped = 0;
        for session in sessions {
            let mut session = session
                .lock()
                .map_err(|_| anyhow!("session lock poisoned"))?;
            dropped += session.pairing.expire(now);
        }
        Ok(dropped)
    }

    /// End every session with no submission for longer than the configured
    /// idle timeout. Returns how many were ended.
    pub fn expire_idle_sessions(&self, now: Instant) -> Result<usize> {
        let idle_timeout = self.config.session_idle_timeout;
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session registry lock poisoned"))?;
        let mut idle = Vec::new();
        for (session_id, session) in sessions.iter() {
            let session = session
                .lock()
                .map_err(|_| anyhow!("session {} lock poisoned", session_id))?;
            if now.saturating_duration_since(session.last_active) > idle_timeout {
                idle.push(session_id.clone());
            }
        }
        for session_id in &idle {
            sessions.remove(session_id);
            log::info!(
                "session {}: idle for more than {:?}, ended",
                session_id,
                idle_timeout
            );
        }
        Ok(idle.len())
    }

    pub fn session_count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session registry lock poisoned"))?;
        Ok(sessions.len())
    }
}

impl Default for DrillEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
