//! Measurement ingestion.
//!
//! The engine never sees pixels. Upstream perception workers hand it
//! structured measurements, either live through the API or recorded to a
//! JSON-lines file and replayed through `RecordingSource`.
//!
//! The ingestion layer is responsible for:
//! - Decoding each record into typed halves
//! - Treating null or non-finite geometry as "not detected"
//!
//! It MUST NOT reorder frames; the detectors rely on recording order.

pub mod recording;

pub use recording::{MeasurementRecord, RecordingSource, RecordingStats};
