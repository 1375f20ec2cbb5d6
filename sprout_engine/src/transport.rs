//! Host transport ingestion. One snapshot per audio block; everything
//! downstream reads the snapshot, never the host directly.

/// Backward jumps below this many beats are treated as host jitter, not a loop.
const LOOP_THRESHOLD_BEATS: f64 = 0.25;

/// Tempo assumed until the host reports one.
const DEFAULT_TEMPO: f64 = 120.0;

/// Per-block snapshot of the host transport. Read-only once built.
#[derive(Debug, Clone, Copy)]
pub struct TransportSnapshot {
    /// Beats per minute, always > 0.
    pub tempo: f64,
    /// Current beat position (quarter notes since transport start).
    pub ppq: f64,
    /// Beat position reported for the previous block.
    pub previous_ppq: f64,
    /// Absolute sample position of the first frame of this block.
    pub sample_position: u64,
    pub sample_rate: f64,
    /// Frames in this block.
    pub block_len: u32,
    /// True when the beat position jumped backwards by more than a
    /// quarter beat (host loop or rewind).
    pub loop_detected: bool,
}

impl TransportSnapshot {
    /// Beats covered by this block at the snapshot tempo.
    pub fn block_beats(&self) -> f64 {
        self.block_len as f64 / self.sample_rate * self.tempo / 60.0
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.sample_rate * 60.0 / self.tempo
    }

    /// Absolute sample position of a beat position near this block.
    /// Negative results are possible for positions before transport start.
    pub fn beat_to_sample(&self, beat: f64) -> i64 {
        let offset = (beat - self.ppq) * self.samples_per_beat();
        self.sample_position as i64 + offset.round() as i64
    }
}

/// Tracks the host transport across blocks and flags loop/rewind jumps.
///
/// Only inter-block state is the last known tempo and beat position; the
/// tracker never mutates anything else.
#[derive(Debug)]
pub struct TransportTracker {
    last_tempo: f64,
    last_ppq: f64,
    has_ppq: bool,
}

impl TransportTracker {
    pub fn new() -> Self {
        Self {
            last_tempo: DEFAULT_TEMPO,
            last_ppq: 0.0,
            has_ppq: false,
        }
    }

    /// Ingest the host-reported transport for one block.
    ///
    /// An absent or invalid tempo keeps the last known value. An absent beat
    /// position carries the previous one forward and never flags a loop.
    pub fn update(
        &mut self,
        tempo: Option<f64>,
        ppq: Option<f64>,
        sample_position: u64,
        block_len: u32,
        sample_rate: f64,
    ) -> TransportSnapshot {
        if let Some(t) = tempo {
            if t > 0.0 {
                self.last_tempo = t;
            }
        }

        let previous_ppq = self.last_ppq;
        let (ppq, loop_detected) = match ppq {
            Some(p) => {
                let looped = self.has_ppq && p < previous_ppq - LOOP_THRESHOLD_BEATS;
                self.has_ppq = true;
                self.last_ppq = p;
                (p, looped)
            }
            None => (previous_ppq, false),
        };

        TransportSnapshot {
            tempo: self.last_tempo,
            ppq,
            previous_ppq,
            sample_position,
            sample_rate,
            block_len,
            loop_detected,
        }
    }
}

impl Default for TransportTracker {
    fn default() -> Self {
        Self::new()
    }
}
