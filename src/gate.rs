//! Shared state primitives: debounce gate, reversal tracking and the
//! fractional repetition tally.

use crate::geometry::{direction, Direction};

/// Minimum frame gap between two accepted events.
#[derive(Clone, Debug)]
pub struct CooldownGate {
    window: u64,
    last_trigger: Option<u64>,
}

impl CooldownGate {
    pub fn new(window: u64) -> Self {
        Self {
            window,
            last_trigger: None,
        }
    }

    /// Open when nothing was accepted yet or the window has elapsed.
    pub fn is_open(&self, frame_index: u64) -> bool {
        match self.last_trigger {
            None => true,
            Some(last) => frame_index.saturating_sub(last) >= self.window,
        }
    }

    pub fn record(&mut self, frame_index: u64) {
        self.last_trigger = Some(frame_index);
    }

}

/// Tracks a scalar signal (ball x or ball area) and the direction that was in
/// effect at the last accepted event.
///
/// `observe` only reports a direction; the accepted direction moves forward
/// through `commit`, so a reversal stays pending until an event consumes it.
#[derive(Clone, Debug)]
pub struct ReversalTracker {
    previous: Option<f64>,
    committed: Direction,
}

impl Default for ReversalTracker {
    fn default() -> Self {
        Self {
            previous: None,
            committed: Direction::Decreasing,
        }
    }
}

/// Direction of the current sample relative to the previous one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub direction: Direction,
    pub delta: f64,
    pub reversed: bool,
}

impl ReversalTracker {
    /// Compare against the previous sample. The first sample compares with itself.
    pub fn observe(&self, current: f64) -> Motion {
        let previous = self.previous.unwrap_or(current);
        let direction = direction(current, previous);
        Motion {
            direction,
            delta: current - previous,
            reversed: direction != self.committed,
        }
    }

    pub fn commit(&mut self, direction: Direction) {
        self.committed = direction;
    }

    pub fn advance(&mut self, current: f64) {
        self.previous = Some(current);
    }
}

/// Sub-event counter. A full repetition is `per_rep` accepted sub-events and
/// the reported count only includes completed repetitions.
#[derive(Clone, Debug)]
pub struct RepTally {
    sub_events: u32,
    per_rep: u32,
}

impl RepTally {
    pub fn new(per_rep: u32) -> Self {
        Self {
            sub_events: 0,
            per_rep: per_rep.max(1),
        }
    }

    pub fn add(&mut self) {
        self.sub_events = self.sub_events.saturating_add(1);
    }

    pub fn sub_events(&self) -> u32 {
        self.sub_events
    }

    /// Fractional progress, e.g. `1.5` after three half-events.
    pub fn accumulated(&self) -> f64 {
        f64::from(self.sub_events) / f64::from(self.per_rep)
    }

    pub fn completed(&self) -> u32 {
        self.sub_events / self.per_rep
    }
}
