//! Sample-index selection. The scheduler only sees the narrow
//! [`SampleIndexProvider`] capability; the pool itself lives with the
//! playback collaborator.

use fastrand::Rng;
use sprout_shared::{RateOption, SampleDirection};

/// Hands out the sample index attached to each generated note-on.
pub trait SampleIndexProvider {
    /// Next index for a note triggered at `rate`, walking in `direction`.
    fn next_index(&mut self, rate: RateOption, direction: SampleDirection, rng: &mut Rng) -> u32;

    /// Index most recently handed out.
    fn current_index(&self) -> u32;
}

/// Default provider: walks a fixed-size pool forward, backward, or randomly.
#[derive(Debug)]
pub struct SampleSelector {
    pool_len: u32,
    cursor: u32,
}

impl SampleSelector {
    pub fn new(pool_len: u32) -> Self {
        Self {
            pool_len,
            cursor: 0,
        }
    }

    pub fn set_pool_len(&mut self, pool_len: u32) {
        self.pool_len = pool_len;
        if pool_len > 0 && self.cursor >= pool_len {
            self.cursor = pool_len - 1;
        }
    }

    pub fn pool_len(&self) -> u32 {
        self.pool_len
    }
}

impl SampleIndexProvider for SampleSelector {
    fn next_index(&mut self, _rate: RateOption, direction: SampleDirection, rng: &mut Rng) -> u32 {
        if self.pool_len == 0 {
            return 0;
        }
        self.cursor = match direction {
            SampleDirection::Forward => (self.cursor + 1) % self.pool_len,
            SampleDirection::Backward => (self.cursor + self.pool_len - 1) % self.pool_len,
            SampleDirection::Random => rng.u32(0..self.pool_len),
        };
        self.cursor
    }

    fn current_index(&self) -> u32 {
        self.cursor
    }
}
