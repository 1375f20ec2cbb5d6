use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scale::ScaleType;

/// Musical subdivision used as a generation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateOption {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl RateOption {
    pub const ALL: [RateOption; 6] = [
        RateOption::Whole,
        RateOption::Half,
        RateOption::Quarter,
        RateOption::Eighth,
        RateOption::Sixteenth,
        RateOption::ThirtySecond,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Duration in beats before rhythm-mode scaling.
    pub fn beats(&self) -> f64 {
        match self {
            RateOption::Whole => 4.0,
            RateOption::Half => 2.0,
            RateOption::Quarter => 1.0,
            RateOption::Eighth => 0.5,
            RateOption::Sixteenth => 0.25,
            RateOption::ThirtySecond => 0.125,
        }
    }

    /// Stable index into per-rate tables.
    pub fn index(&self) -> usize {
        match self {
            RateOption::Whole => 0,
            RateOption::Half => 1,
            RateOption::Quarter => 2,
            RateOption::Eighth => 3,
            RateOption::Sixteenth => 4,
            RateOption::ThirtySecond => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RateOption::Whole => "1/1",
            RateOption::Half => "1/2",
            RateOption::Quarter => "1/4",
            RateOption::Eighth => "1/8",
            RateOption::Sixteenth => "1/16",
            RateOption::ThirtySecond => "1/32",
        }
    }
}

/// Rhythm feel applied to every rate duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhythmMode {
    Normal,
    Dotted,
    Triplet,
}

impl Default for RhythmMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl RhythmMode {
    pub fn factor(&self) -> f64 {
        match self {
            RhythmMode::Normal => 1.0,
            RhythmMode::Dotted => 1.5,
            RhythmMode::Triplet => 2.0 / 3.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RhythmMode::Normal => "Normal",
            RhythmMode::Dotted => "Dotted",
            RhythmMode::Triplet => "Triplet",
        }
    }
}

/// Which side of the base value a randomized draw may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomDirection {
    Left,
    Right,
    Bidirectional,
}

/// Arpeggiator-style walk applied to the semitone step offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDirection {
    Up,
    Down,
    Bidirectional,
    Random,
}

/// Direction the sample selector walks through the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleDirection {
    Forward,
    Backward,
    Random,
}

/// Per-block snapshot of every generator control.
///
/// Owned by the surrounding plugin state and published to the engine as a
/// whole; the engine reads exactly one snapshot per audio block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Per-rate trigger intensity, 0-100. Zero removes the rate from the
    /// weighted selection entirely.
    pub rate_intensity: [u8; RateOption::COUNT],
    /// Overall trigger probability, 0-100.
    pub trigger_probability: u8,
    pub rhythm_mode: RhythmMode,

    /// Gate length as a percentage of the rate duration, 0-100.
    pub gate: u8,
    pub gate_randomize: u8,
    pub gate_direction: RandomDirection,

    /// Velocity as a percentage of full MIDI range, 0-100.
    pub velocity: u8,
    pub velocity_randomize: u8,
    pub velocity_direction: RandomDirection,

    pub scale: ScaleType,
    /// Root key for scale membership (only its pitch class matters).
    pub scale_root: u8,

    /// Maximum semitone step offset. Zero disables stepping.
    pub step_count: u8,
    pub step_probability: u8,
    pub step_direction: StepDirection,

    /// Maximum octave jump. Zero disables.
    pub octave_count: u8,
    pub octave_probability: u8,
    /// When set, octave jumps go down as often as up.
    pub octave_bidirectional: bool,

    pub sample_direction: SampleDirection,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let mut rate_intensity = [0u8; RateOption::COUNT];
        rate_intensity[RateOption::Quarter.index()] = 100;
        Self {
            rate_intensity,
            trigger_probability: 100,
            rhythm_mode: RhythmMode::Normal,
            gate: 80,
            gate_randomize: 0,
            gate_direction: RandomDirection::Bidirectional,
            velocity: 80,
            velocity_randomize: 0,
            velocity_direction: RandomDirection::Bidirectional,
            scale: ScaleType::Major,
            scale_root: 60,
            step_count: 0,
            step_probability: 100,
            step_direction: StepDirection::Up,
            octave_count: 0,
            octave_probability: 100,
            octave_bidirectional: false,
            sample_direction: SampleDirection::Forward,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field} must be within 0-100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u8 },
    #[error("scale root must be a valid MIDI note, got {0}")]
    RootOutOfRange(u8),
}

impl GeneratorSettings {
    /// Range check for the non-real-time surface. The engine itself never
    /// rejects a snapshot; it clamps while computing.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn percent(field: &'static str, value: u8) -> Result<(), SettingsError> {
            if value > 100 {
                Err(SettingsError::PercentOutOfRange { field, value })
            } else {
                Ok(())
            }
        }

        for &intensity in &self.rate_intensity {
            percent("rate intensity", intensity)?;
        }
        percent("trigger probability", self.trigger_probability)?;
        percent("gate", self.gate)?;
        percent("gate randomize", self.gate_randomize)?;
        percent("velocity", self.velocity)?;
        percent("velocity randomize", self.velocity_randomize)?;
        percent("step probability", self.step_probability)?;
        percent("octave probability", self.octave_probability)?;
        if self.scale_root > 127 {
            return Err(SettingsError::RootOutOfRange(self.scale_root));
        }
        Ok(())
    }
}
