//! Pitch derivation: arpeggiator stepping, scale correction, octave jumps.

use fastrand::Rng;
use sprout_shared::{GeneratorSettings, StepDirection};

/// Probability roll against a 0-100 percentage.
pub(crate) fn roll(rng: &mut Rng, percent: u8) -> bool {
    rng.u8(0..100) < percent
}

/// Arpeggiator walk state. Persists across notes; reset only explicitly.
#[derive(Debug, Clone, Copy)]
struct ArpStepState {
    step: i32,
    /// Direction bit for the bidirectional triangle walk.
    ascending: bool,
}

impl ArpStepState {
    fn origin() -> Self {
        Self {
            step: 0,
            ascending: true,
        }
    }
}

/// Maps raw input notes onto the active scale, with optional semitone
/// stepping and octave variation.
#[derive(Debug)]
pub struct ScaleQuantizer {
    state: ArpStepState,
}

impl ScaleQuantizer {
    pub fn new() -> Self {
        Self {
            state: ArpStepState::origin(),
        }
    }

    /// Puts the walk back at step zero, ascending.
    pub fn reset(&mut self) {
        self.state = ArpStepState::origin();
    }

    /// Current semitone step offset, for UI display.
    pub fn step_offset(&self) -> i32 {
        self.state.step
    }

    /// Derives the output note for one trigger. Always lands inside the
    /// active scale and the 0-127 MIDI range.
    pub fn apply(&mut self, input_note: u8, settings: &GeneratorSettings, rng: &mut Rng) -> u8 {
        let mut note = input_note as i32;

        if settings.step_count > 0 && roll(rng, settings.step_probability) {
            self.advance(settings.step_count as i32, settings.step_direction, rng);
            note += self.state.step;
        }

        // The unmodified input is snapped too; held notes outside the scale
        // must not leak through.
        let snapped = settings
            .scale
            .snap(note.clamp(0, 127) as u8, settings.scale_root);
        let mut note = snapped as i32;

        if settings.octave_count > 0 && roll(rng, settings.octave_probability) {
            let octaves = rng.i32(1..=settings.octave_count as i32);
            let up = !settings.octave_bidirectional || rng.bool();
            note += if up { octaves * 12 } else { -octaves * 12 };
        }

        note.clamp(0, 127) as u8
    }

    fn advance(&mut self, count: i32, direction: StepDirection, rng: &mut Rng) {
        match direction {
            StepDirection::Down => {
                self.state.step -= 1;
                if self.state.step < 0 {
                    self.state.step = count;
                }
            }
            StepDirection::Up => {
                self.state.step += 1;
                if self.state.step > count {
                    self.state.step = 0;
                }
            }
            StepDirection::Bidirectional => {
                if self.state.ascending {
                    self.state.step += 1;
                    if self.state.step >= count {
                        self.state.step = count;
                        self.state.ascending = false;
                    }
                } else {
                    self.state.step -= 1;
                    if self.state.step <= 0 {
                        self.state.step = 0;
                        self.state.ascending = true;
                    }
                }
            }
            StepDirection::Random => {
                self.state.step = rng.i32(0..=count);
            }
        }
    }
}

impl Default for ScaleQuantizer {
    fn default() -> Self {
        Self::new()
    }
}
