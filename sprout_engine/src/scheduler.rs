//! The per-block note scheduling state machine: input latch, active-note
//! expiry, pending promotion, and weighted generation on the beat grid.

use fastrand::Rng;
use sprout_shared::{
    EventBuffer, GeneratorSettings, MAX_PENDING_NOTES, MidiEvent, MidiMessage, OutputEvent,
    RandomDirection, RateOption,
};

use crate::grid::{GridScheduler, TriggerHistory};
use crate::quantizer::{ScaleQuantizer, roll};
use crate::sampler::SampleIndexProvider;
use crate::transport::TransportSnapshot;

/// Shortest audible gate, in seconds.
const MIN_GATE_SECONDS: f64 = 0.005;

/// The single currently-sounding generated note.
#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    note: u8,
    start_sample: u64,
    duration: u64,
}

/// A note scheduled past the current block's end.
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    note: u8,
    velocity: u8,
    start_sample: u64,
    duration: u64,
    sample_index: u32,
}

/// Draws a percentage around `value` according to the randomize direction.
/// Both bounds are clamped to 0-100 before the draw.
fn randomized_percent(value: u8, amount: u8, direction: RandomDirection, rng: &mut Rng) -> f64 {
    if amount == 0 {
        return value as f64;
    }
    let v = value as f64;
    let a = amount as f64;
    let (lo, hi) = match direction {
        RandomDirection::Left => (v - a, v),
        RandomDirection::Right => (v, v + a),
        RandomDirection::Bidirectional => {
            if rng.bool() {
                (v - a, v)
            } else {
                (v, v + a)
            }
        }
    };
    let lo = lo.clamp(0.0, 100.0);
    let hi = hi.clamp(0.0, 100.0);
    if hi <= lo {
        return lo;
    }
    lo + rng.f64() * (hi - lo)
}

/// Monophonic generative note scheduler.
///
/// All working storage is fixed-capacity; nothing on the block path
/// allocates, blocks, or locks.
#[derive(Debug)]
pub struct NoteScheduler {
    /// The held input note driving generation, if any.
    input_note: Option<u8>,
    active: Option<ActiveNote>,
    /// Kept sorted by ascending start sample.
    pending: [Option<PendingNote>; MAX_PENDING_NOTES],
    history: TriggerHistory,
    quantizer: ScaleQuantizer,

    // Snapshot values mirrored to the UI by the engine facade.
    last_gate: f32,
    last_velocity: f32,
    last_sample_index: u32,
}

impl NoteScheduler {
    pub fn new() -> Self {
        Self {
            input_note: None,
            active: None,
            pending: [None; MAX_PENDING_NOTES],
            history: TriggerHistory::new(),
            quantizer: ScaleQuantizer::new(),
            last_gate: 0.0,
            last_velocity: 0.0,
            last_sample_index: 0,
        }
    }

    pub fn note_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn input_note(&self) -> Option<u8> {
        self.input_note
    }

    /// Gate percentage drawn for the most recent trigger.
    pub fn last_gate_percent(&self) -> f32 {
        self.last_gate
    }

    /// Velocity percentage drawn for the most recent trigger.
    pub fn last_velocity_percent(&self) -> f32 {
        self.last_velocity
    }

    /// Sample index of the most recently emitted note-on.
    pub fn current_sample_index(&self) -> u32 {
        self.last_sample_index
    }

    /// Puts the arpeggiator walk back at its origin.
    pub fn reset_arp(&mut self) {
        self.quantizer.reset();
    }

    /// Cuts the generated note at frame 0 and drops everything scheduled.
    pub fn all_notes_off(&mut self, out: &mut EventBuffer) {
        if let Some(active) = self.active.take() {
            out.push(OutputEvent::NoteOff {
                frame: 0,
                note: active.note,
            });
        }
        self.pending = [None; MAX_PENDING_NOTES];
    }

    /// Runs one audio block. Events land in `out` ordered by frame.
    pub fn process_block(
        &mut self,
        snapshot: &TransportSnapshot,
        settings: &GeneratorSettings,
        input: &[MidiEvent],
        samples: &mut dyn SampleIndexProvider,
        rng: &mut Rng,
        out: &mut EventBuffer,
    ) {
        let block_start = snapshot.sample_position;
        let block_end = block_start + snapshot.block_len as u64;

        // No generated note-on may precede an off we already emitted this
        // block; bumped as offs are pushed.
        let mut earliest_on_frame = 0u32;

        // 1. Transport loop: the old schedule no longer maps to valid beat
        // positions. Tear everything down and start cold.
        if snapshot.loop_detected {
            self.all_notes_off(out);
            self.history.reset();
        }

        // 2. Ingest input MIDI. Note-on latches the driving note; a matching
        // note-off releases it and cuts the generated note short. Everything
        // else passes through untouched.
        for ev in input {
            match ev.message {
                MidiMessage::NoteOn { note, .. } => {
                    self.input_note = Some(note);
                }
                MidiMessage::NoteOff { note } if self.input_note == Some(note) => {
                    self.input_note = None;
                    if let Some(active) = self.active.take() {
                        out.push(OutputEvent::NoteOff {
                            frame: ev.frame,
                            note: active.note,
                        });
                        earliest_on_frame = earliest_on_frame.max(ev.frame);
                    }
                }
                MidiMessage::NoteOff { .. } => {}
                MidiMessage::Other(_) => {
                    out.push(OutputEvent::Passthrough(*ev));
                }
            }
        }

        // 3. Expire the active note when its end lands in this block.
        if let Some(active) = self.active {
            let end = active.start_sample + active.duration;
            if end < block_end {
                let frame = end.saturating_sub(block_start) as u32;
                out.push(OutputEvent::NoteOff {
                    frame,
                    note: active.note,
                });
                earliest_on_frame = earliest_on_frame.max(frame);
                self.active = None;
            }
        }

        // 4. Promote pending notes that became due; drop the ones whose
        // deadline passed without a block covering them.
        for i in 0..MAX_PENDING_NOTES {
            let Some(p) = self.pending[i] else { continue };
            if p.start_sample >= block_end {
                continue;
            }
            self.pending[i] = None;
            if p.start_sample < block_start {
                // Missed deadline: never fires.
                continue;
            }
            let frame = ((p.start_sample - block_start) as u32).max(earliest_on_frame);
            if let Some(prev) = self.active.take() {
                out.push(OutputEvent::NoteOff {
                    frame,
                    note: prev.note,
                });
            }
            if let Some(off) = self.begin_note(&p, frame, block_start, block_end, out) {
                earliest_on_frame = earliest_on_frame.max(off);
            }
        }

        // 5. Generate a new note only while the input note is held and
        // nothing is sounding.
        if let Some(input_note) = self.input_note {
            if self.active.is_none() {
                self.try_generate(
                    input_note,
                    snapshot,
                    settings,
                    samples,
                    rng,
                    out,
                    earliest_on_frame,
                );
            }
        }

        out.sort_by_frame();
    }

    fn try_generate(
        &mut self,
        input_note: u8,
        snapshot: &TransportSnapshot,
        settings: &GeneratorSettings,
        samples: &mut dyn SampleIndexProvider,
        rng: &mut Rng,
        out: &mut EventBuffer,
        earliest_on_frame: u32,
    ) {
        // Collect the rates whose grid line falls inside this block.
        let mut candidates = [(RateOption::Quarter, 0u32); RateOption::COUNT];
        let mut count = 0;
        let mut total = 0u32;
        for rate in RateOption::ALL {
            let intensity = settings.rate_intensity[rate.index()] as u32;
            if intensity == 0 {
                continue;
            }
            if GridScheduler::is_trigger_eligible(rate, settings, snapshot, &self.history) {
                candidates[count] = (rate, intensity);
                count += 1;
                total += intensity;
            }
        }
        if count == 0 {
            return;
        }

        // Weighted draw: weight = configured intensity.
        let mut pick = rng.u32(0..total);
        let mut rate = candidates[0].0;
        for &(r, w) in &candidates[..count] {
            if pick < w {
                rate = r;
                break;
            }
            pick -= w;
        }

        // A failed roll leaves the history untouched so the same grid line is
        // re-evaluated next block.
        if !roll(rng, settings.trigger_probability) {
            return;
        }

        let grid_line = GridScheduler::next_grid_point(rate, settings, snapshot, &self.history);

        let full_len = GridScheduler::rate_beats(rate, settings) * snapshot.samples_per_beat();
        let gate = randomized_percent(
            settings.gate,
            settings.gate_randomize,
            settings.gate_direction,
            rng,
        );
        let min_len = MIN_GATE_SECONDS * snapshot.sample_rate;
        let duration = (full_len * gate / 100.0).max(min_len) as u64;

        let vel = randomized_percent(
            settings.velocity,
            settings.velocity_randomize,
            settings.velocity_direction,
            rng,
        );
        let velocity = (vel / 100.0 * 127.0).round() as u8;

        let note = self.quantizer.apply(input_note, settings, rng);
        let sample_index = samples.next_index(rate, settings.sample_direction, rng);

        self.last_gate = gate as f32;
        self.last_velocity = vel as f32;

        let block_start = snapshot.sample_position;
        let block_end = block_start + snapshot.block_len as u64;
        let start = snapshot.beat_to_sample(grid_line).max(0) as u64;

        let pending = PendingNote {
            note,
            velocity,
            start_sample: start,
            duration,
            sample_index,
        };
        if start < block_end {
            let frame = (start.saturating_sub(block_start) as u32).max(earliest_on_frame);
            self.begin_note(&pending, frame, block_start, block_end, out);
        } else {
            self.enqueue(pending);
        }

        // The grid line is consumed either way, never the fudged fire time;
        // spacing stays exactly one interval. Beat zero still counts as a
        // reference trigger, so it must not read back as an empty history.
        self.history.record(rate, grid_line.max(1e-9));
    }

    /// Emits the note-on and tracks the note as sounding. A note shorter than
    /// the remainder of the block gets its note-off in the same pass; the off
    /// frame is returned so the caller keeps later note-ons behind it.
    fn begin_note(
        &mut self,
        p: &PendingNote,
        frame: u32,
        block_start: u64,
        block_end: u64,
        out: &mut EventBuffer,
    ) -> Option<u32> {
        out.push(OutputEvent::NoteOn {
            frame,
            note: p.note,
            velocity: p.velocity,
            sample_index: p.sample_index,
        });
        self.last_sample_index = p.sample_index;

        let start_sample = block_start + frame as u64;
        let end = start_sample + p.duration;
        if end < block_end {
            let off_frame = (end - block_start) as u32;
            out.push(OutputEvent::NoteOff {
                frame: off_frame,
                note: p.note,
            });
            self.active = None;
            Some(off_frame)
        } else {
            self.active = Some(ActiveNote {
                note: p.note,
                start_sample,
                duration: p.duration,
            });
            None
        }
    }

    /// Sorted insert by ascending start sample. A full queue drops the new
    /// note, same policy as a missed deadline.
    fn enqueue(&mut self, note: PendingNote) -> bool {
        let mut insert_at = MAX_PENDING_NOTES;
        for i in 0..MAX_PENDING_NOTES {
            match self.pending[i] {
                None => {
                    insert_at = i;
                    break;
                }
                Some(p) if note.start_sample < p.start_sample => {
                    insert_at = i;
                    break;
                }
                Some(_) => {}
            }
        }
        if insert_at == MAX_PENDING_NOTES || self.pending[MAX_PENDING_NOTES - 1].is_some() {
            return false;
        }
        for i in (insert_at..MAX_PENDING_NOTES - 1).rev() {
            self.pending[i + 1] = self.pending[i];
        }
        self.pending[insert_at] = Some(note);
        true
    }
}

impl Default for NoteScheduler {
    fn default() -> Self {
        Self::new()
    }
}
