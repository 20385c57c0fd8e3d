//! Injectable random source
//!
//! Every draw the planner makes goes through [`RandomSource`] so tests can
//! substitute a scripted sequence. Any `rand` generator qualifies; the
//! planner seeds a `ChaCha8Rng` for reproducible runs.

use rand::{Rng, RngCore};
use std::collections::VecDeque;

pub trait RandomSource {
    /// Uniform integer in `lo..hi`; returns `lo` when the range is empty
    fn uniform_int(&mut self, lo: i32, hi: i32) -> i32;

    /// Percentile roll in `0..100`
    fn roll_percent(&mut self) -> i32 {
        self.uniform_int(0, 100)
    }

    /// Uniform index into a collection of `len` items
    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let upper = i32::try_from(len).unwrap_or(i32::MAX);
        Some(self.uniform_int(0, upper) as usize)
    }
}

impl<R: RngCore> RandomSource for R {
    fn uniform_int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            lo
        } else {
            self.gen_range(lo..hi)
        }
    }
}

/// Replays a fixed sequence of values, clamped into the requested range
///
/// Once the script runs out every draw returns `lo`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRng {
    values: VecDeque<i32>,
}

impl ScriptedRng {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedRng {
    fn uniform_int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        match self.values.pop_front() {
            Some(value) => value.clamp(lo, hi - 1),
            None => lo,
        }
    }
}
