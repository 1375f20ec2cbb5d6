//! Beat-grid arithmetic: decides whether a rate's next grid line falls inside
//! the current block, and which line that is.

use sprout_shared::{GeneratorSettings, RateOption};

use crate::transport::TransportSnapshot;

/// Cold-start trigger window in beats at 120 BPM. Wider than the steady-state
/// window because there is no previous trigger to extrapolate from.
/// Tuned for behavioral parity; tunable, not load-bearing.
const COLD_START_WINDOW: f64 = 0.05;

/// Steady-state slack window in beats at 120 BPM. Narrow to avoid
/// double-firing near a block boundary. Tunable, not load-bearing.
const STEADY_WINDOW: f64 = 0.01;

/// Last-trigger beat position per rate. A zero entry means the rate has not
/// fired since transport start (or since the last loop reset).
#[derive(Debug, Clone, Copy)]
pub struct TriggerHistory {
    last_trigger: [f64; RateOption::COUNT],
}

impl TriggerHistory {
    pub fn new() -> Self {
        Self {
            last_trigger: [0.0; RateOption::COUNT],
        }
    }

    pub fn get(&self, rate: RateOption) -> f64 {
        self.last_trigger[rate.index()]
    }

    pub fn record(&mut self, rate: RateOption, beat: f64) {
        self.last_trigger[rate.index()] = beat;
    }

    pub fn reset(&mut self) {
        self.last_trigger = [0.0; RateOption::COUNT];
    }
}

impl Default for TriggerHistory {
    fn default() -> Self {
        Self::new()
    }
}

struct GridEval {
    /// The grid line this evaluation selects.
    line: f64,
    /// Whether that line may fire during the current block.
    eligible: bool,
}

/// Stateless grid-line arithmetic. History is passed in; the scheduler owns
/// all mutation.
pub struct GridScheduler;

impl GridScheduler {
    /// Rate duration in beats under the active rhythm mode. Degenerates to a
    /// quarter note if the scaled duration is not a positive number.
    pub fn rate_beats(rate: RateOption, settings: &GeneratorSettings) -> f64 {
        let d = rate.beats() * settings.rhythm_mode.factor();
        if d > 0.0 { d } else { 1.0 }
    }

    /// Windows widen with tempo so that their span in wall-clock time does
    /// not collapse at high BPM.
    fn window(base: f64, tempo: f64) -> f64 {
        base * (tempo / 120.0).max(1.0)
    }

    fn evaluate(
        rate: RateOption,
        settings: &GeneratorSettings,
        snapshot: &TransportSnapshot,
        history: &TriggerHistory,
    ) -> GridEval {
        let d = Self::rate_beats(rate, settings);
        let pos = snapshot.ppq;
        let span = snapshot.block_beats();
        let last = history.get(rate);

        if last <= 0.0 || snapshot.loop_detected {
            // Cold start: no reference trigger. Anchor on the grid line at or
            // before the current position.
            let line = (pos / d).floor() * d;
            let window = Self::window(COLD_START_WINDOW, snapshot.tempo);
            if pos - line < window {
                return GridEval {
                    line,
                    eligible: true,
                };
            }
            let next = line + d;
            GridEval {
                line: next,
                eligible: next < pos + span,
            }
        } else {
            // Steady state: extrapolate strictly past the last trigger. The
            // window also admits a line that slipped just behind the block
            // start (scheduling slack, small backward jitter).
            let window = Self::window(STEADY_WINDOW, snapshot.tempo);
            let mut next = last + d * (((pos - last - window) / d).floor() + 1.0);
            if next <= last + 1e-9 {
                next += d;
            }
            // The same slack extends past the block end: a line landing just
            // beyond it is consumed now and scheduled as a pending note.
            GridEval {
                line: next,
                eligible: next < pos + span + window,
            }
        }
    }

    pub fn is_trigger_eligible(
        rate: RateOption,
        settings: &GeneratorSettings,
        snapshot: &TransportSnapshot,
        history: &TriggerHistory,
    ) -> bool {
        Self::evaluate(rate, settings, snapshot, history).eligible
    }

    /// The exact beat line an eligible trigger would consume. Shares its
    /// arithmetic with [`Self::is_trigger_eligible`].
    pub fn next_grid_point(
        rate: RateOption,
        settings: &GeneratorSettings,
        snapshot: &TransportSnapshot,
        history: &TriggerHistory,
    ) -> f64 {
        Self::evaluate(rate, settings, snapshot, history).line
    }
}
