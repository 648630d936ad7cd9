//! Rolling per-channel sample window.

/// Fixed-capacity window of the most recent samples, oldest first.
///
/// Until the window fills, the leading slots hold zeros. The capacity never
/// changes after construction.
#[derive(Debug, Clone)]
pub struct History {
    values: Vec<f32>,
    total: u64,
}

impl History {
    /// Creates a zero-filled window holding `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            values: vec![0.0; capacity],
            total: 0,
        }
    }

    /// Shift the window left by `samples.len()` and write `samples` at the tail.
    ///
    /// Batches longer than the capacity keep only their last `capacity` samples.
    pub fn append(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let capacity = self.values.len();
        let incoming = if samples.len() > capacity {
            &samples[samples.len() - capacity..]
        } else {
            samples
        };

        self.values.rotate_left(incoming.len());
        let start = capacity - incoming.len();
        self.values[start..].copy_from_slice(incoming);
        self.total += samples.len() as u64;
    }

    /// Window contents, oldest first.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Number of samples ever appended.
    pub fn total_samples(&self) -> u64 {
        self.total
    }

    /// Number of window slots holding real samples rather than padding.
    pub fn filled(&self) -> usize {
        self.total.min(self.values.len() as u64) as usize
    }

    /// Logical position (since the first append) of window slot 0.
    ///
    /// Negative while the window still contains left padding.
    pub fn window_start(&self) -> i64 {
        self.total as i64 - self.values.len() as i64
    }

    /// Write the window as interleaved `(index, value)` pairs into `out`.
    pub fn write_vertices(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.values.len() * 2);
        for (i, v) in self.values.iter().enumerate() {
            out.push(i as f32);
            out.push(*v);
        }
    }

    /// Interleaved `(index, value)` pairs, `2 * capacity` scalars.
    pub fn vertices(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.write_vertices(&mut out);
        out
    }
}
