use serde::{Deserialize, Serialize};

/// Raw MIDI bytes for messages the engine does not interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMidi(pub [u8; 3]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    /// Anything else (CC, pitch bend, aftertouch...) is forwarded untouched.
    Other(RawMidi),
}

/// An incoming MIDI event with its sample offset inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub frame: u32,
    pub message: MidiMessage,
}

/// Events the engine emits for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    NoteOn {
        frame: u32,
        note: u8,
        velocity: u8,
        /// Index into the sample pool, chosen by the sample selector.
        sample_index: u32,
    },
    NoteOff {
        frame: u32,
        note: u8,
    },
    Passthrough(MidiEvent),
}

impl OutputEvent {
    pub fn frame(&self) -> u32 {
        match self {
            OutputEvent::NoteOn { frame, .. } => *frame,
            OutputEvent::NoteOff { frame, .. } => *frame,
            OutputEvent::Passthrough(ev) => ev.frame,
        }
    }
}

/// Pre-sized event sink for one audio block.
///
/// Storage is allocated once at construction; pushing past capacity drops the
/// event instead of reallocating on the audio thread.
pub struct EventBuffer {
    events: Vec<OutputEvent>,
    dropped: usize,
}

impl EventBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// Returns false if the event was dropped because the buffer is full.
    pub fn push(&mut self, event: OutputEvent) -> bool {
        if self.events.len() < self.events.capacity() {
            self.events.push(event);
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events dropped since the last clear.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Stable in-place sort by frame offset. Events pushed earlier keep their
    /// relative order at equal frames, so a note-off pushed before a note-on
    /// at the same offset stays first. Bounded by capacity, allocation-free.
    pub fn sort_by_frame(&mut self) {
        for i in 1..self.events.len() {
            let mut j = i;
            while j > 0 && self.events[j - 1].frame() > self.events[j].frame() {
                self.events.swap(j - 1, j);
                j -= 1;
            }
        }
    }
}
