// RollingBuffer - fixed-capacity sliding window over one band's power series
//
// Strict FIFO: once the buffer is full, the oldest value is evicted before
// the new one is appended. The buffer is owned exclusively by the pipeline
// stage that feeds it; downstream computations only ever see immutable
// snapshots, so a push can never be observed half-applied.

use std::collections::VecDeque;

/// Fixed-capacity FIFO window of recent scalar values
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create a buffer with the given capacity
    ///
    /// # Panics
    /// Panics if `capacity` is 0; a zero-length window is a configuration
    /// bug, not a runtime condition.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest first when at capacity
    ///
    /// Pushing is total; there is no error condition.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Immutable ordered copy for downstream read-only computations
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
