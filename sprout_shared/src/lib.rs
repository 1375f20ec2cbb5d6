pub mod events;
pub mod scale;
pub mod settings;

// Re-exports
pub use events::{EventBuffer, MidiEvent, MidiMessage, OutputEvent, RawMidi};
pub use scale::ScaleType;
pub use settings::{
    GeneratorSettings, RandomDirection, RateOption, RhythmMode, SampleDirection, SettingsError,
    StepDirection,
};

/// Upper bound on notes scheduled past the current block.
pub const MAX_PENDING_NOTES: usize = 8;

/// Pre-sized per-block capacity of the output event buffer.
pub const MAX_OUTPUT_EVENTS: usize = 64;
