//! Offline replay of a recorded measurement stream through the engine.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::engine::{DrillEngine, FrameOutcome};
use crate::ingest::RecordingSource;

/// One output line per evaluated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLine {
    pub frame_index: u64,
    pub count: u32,
    pub triggered: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub records: u64,
    pub frames_evaluated: u64,
    pub triggers: u64,
    pub final_count: u32,
    /// Frames still missing a half when the recording ended.
    pub unpaired_frames: usize,
}

/// Feed every record of `source` to `session_id` and write a `ReplayLine`
/// for each evaluated frame.
///
/// Replay runs on a frozen clock: a recording has no wall-clock timing, so
/// only the pending-frame capacity bounds unpaired halves.
pub fn replay<R: BufRead, W: Write>(
    engine: &DrillEngine,
    source: &mut RecordingSource<R>,
    session_id: &str,
    drill_id: &str,
    out: &mut W,
) -> Result<ReplaySummary> {
    let clock = Instant::now();
    let mut summary = ReplaySummary::default();
    while let Some(record) = source.next_record()? {
        summary.records += 1;
        let outcome = engine.submit_at(
            session_id,
            drill_id,
            record.frame_index,
            record.detection,
            record.pose,
            clock,
        )?;
        let FrameOutcome::Evaluated(result) = outcome else {
            continue;
        };
        summary.frames_evaluated += 1;
        if result.triggered {
            summary.triggers += 1;
            summary.final_count = result.count;
        }
        let line = ReplayLine {
            frame_index: record.frame_index,
            count: result.count,
            triggered: result.triggered,
        };
        serde_json::to_writer(&mut *out, &line)?;
        out.write_all(b"\n")
            .map_err(|e| anyhow!("failed to write replay output: {}", e))?;
    }
    if let Some(session) = engine.summary(session_id)? {
        summary.unpaired_frames = session.pending_frames;
    }
    Ok(summary)
}
