//! Run-length segments for gated drawing.
//!
//! Each incoming batch is classified by its leading sample. Consecutive batches
//! with the same classification extend one run; a change starts a new run. Runs
//! are measured in logical sample positions counted from the first append, so
//! boundaries only ever increase and the table is never compacted.

use std::ops::Range;

/// Default discriminator threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Classification of a batch's leading sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Below the threshold ("no signal").
    Low,
    /// At or above the threshold ("signal present").
    High,
}

impl Level {
    /// Classify a sample. NaN is treated as low.
    #[must_use]
    pub fn classify(sample: f32, threshold: f32) -> Self {
        if sample >= threshold {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// What a classification does to the run table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Extend,
}

/// Run tracker state. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NoRun,
    InLow,
    InHigh,
}

impl RunState {
    /// Pure transition on the next batch classification.
    #[must_use]
    pub fn next(self, level: Level) -> (RunState, Transition) {
        let target = match level {
            Level::Low => RunState::InLow,
            Level::High => RunState::InHigh,
        };
        let transition = if self == target {
            Transition::Extend
        } else {
            Transition::Start
        };
        (target, transition)
    }

    pub fn level(self) -> Option<Level> {
        match self {
            RunState::NoRun => None,
            RunState::InLow => Some(Level::Low),
            RunState::InHigh => Some(Level::High),
        }
    }
}

/// One contiguous segment of logical sample positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: u64,
    pub len: u64,
    pub level: Level,
}

impl Run {
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    /// Intersect with a window of `capacity` slots whose slot 0 sits at logical
    /// position `window_start`, returning the covered slot range.
    pub fn clip(&self, window_start: i64, capacity: usize) -> Option<Range<u32>> {
        let window_end = window_start + capacity as i64;
        let lo = (self.start as i64).max(window_start).max(0);
        let hi = (self.end() as i64).min(window_end);
        if hi <= lo {
            return None;
        }
        Some((lo - window_start) as u32..(hi - window_start) as u32)
    }
}

/// Per-channel run table.
#[derive(Debug, Clone)]
pub struct RunTable {
    runs: Vec<Run>,
    state: RunState,
    threshold: f32,
    length: u64,
}

impl RunTable {
    pub fn new(threshold: f32) -> Self {
        Self {
            runs: Vec::new(),
            state: RunState::NoRun,
            threshold,
            length: 0,
        }
    }

    /// Account for one appended batch. Empty batches are ignored.
    pub fn observe(&mut self, batch: &[f32]) {
        let Some(&leading) = batch.first() else {
            return;
        };
        let n = batch.len() as u64;
        let (next, transition) = self.state.next(Level::classify(leading, self.threshold));

        match (transition, self.runs.last_mut()) {
            (Transition::Extend, Some(run)) => run.len += n,
            _ => self.runs.push(Run {
                start: self.length,
                len: n,
                level: next.level().unwrap_or(Level::Low),
            }),
        }

        self.state = next;
        self.length += n;
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Logical length covered by all runs.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Slot ranges of the high runs visible in the window, skipping strips too
    /// short to form a line.
    pub fn visible_strips(&self, window_start: i64, capacity: usize) -> Vec<Range<u32>> {
        self.runs
            .iter()
            .filter(|run| run.level == Level::High)
            .filter_map(|run| run.clip(window_start, capacity))
            .filter(|range| range.len() >= 2)
            .collect()
    }
}

impl Default for RunTable {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
