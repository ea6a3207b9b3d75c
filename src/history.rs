//! Bounded history buffers for charting recent samples.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while dq.len() >= cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Fixed-capacity ring of recent values that can be frozen.
#[derive(Debug, Clone)]
pub struct SampleRing {
    values: VecDeque<f32>,
    cap: usize,
    paused: bool,
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SampleRing {
    pub fn new(cap: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(cap),
            cap,
            paused: false,
        }
    }

    /// Appends a value, evicting the oldest when full. Ignored while paused.
    pub fn push(&mut self, v: f32) {
        if self.paused {
            return;
        }
        push_capped(&mut self.values, v, self.cap);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn latest(&self) -> Option<f32> {
        self.values.back().copied()
    }

    /// Oldest first.
    pub fn values(&self) -> Vec<f32> {
        self.values.iter().copied().collect()
    }

    pub fn max(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::max)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}
