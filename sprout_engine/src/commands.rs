/// Control-thread commands, drained by the engine at the start of each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Replace the RNG with a freshly seeded one.
    Reseed(u64),
    /// Put the arpeggiator step walk back at its origin.
    ResetArpStep,
    /// Cut the generated note and drop everything scheduled.
    AllNotesOff,
    /// The sample pool was edited; the selector walks the new length.
    SetSamplePoolLen(u32),
}
