//! Engine facade: owns every per-instance piece of state, hands settings
//! from the control thread to the audio thread, and mirrors a few values
//! back for the UI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use anyhow::Context;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, bounded};
use fastrand::Rng;
use sprout_shared::{EventBuffer, GeneratorSettings, MAX_OUTPUT_EVENTS, MidiEvent, OutputEvent};

use crate::commands::EngineCommand;
use crate::sampler::{SampleIndexProvider, SampleSelector};
use crate::scheduler::NoteScheduler;
use crate::transport::TransportTracker;

/// Command backlog the control thread may build up between blocks.
const COMMAND_QUEUE_LEN: usize = 64;

/// Values the audio thread publishes for lock-free UI reads.
struct EngineShared {
    gate_bits: AtomicU32,
    velocity_bits: AtomicU32,
    sample_index: AtomicU32,
    note_active: AtomicBool,
}

/// Control-thread handle: publish settings, send commands, read mirrors.
/// Cheap to clone; every accessor is a plain atomic read.
#[derive(Clone)]
pub struct EngineHandle {
    settings: Arc<ArcSwap<GeneratorSettings>>,
    command_tx: Sender<EngineCommand>,
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    /// Validates and publishes a new settings snapshot. The audio thread
    /// picks it up at its next block boundary.
    pub fn publish_settings(&self, settings: GeneratorSettings) -> anyhow::Result<()> {
        settings
            .validate()
            .context("rejecting generator settings")?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    /// Returns false when the command queue is full and the command was
    /// dropped.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("engine command queue full, dropping {command:?}");
                false
            }
        }
    }

    /// Gate percentage drawn for the most recent trigger.
    pub fn gate_percent(&self) -> f32 {
        f32::from_bits(self.shared.gate_bits.load(Ordering::Relaxed))
    }

    /// Velocity percentage drawn for the most recent trigger.
    pub fn velocity_percent(&self) -> f32 {
        f32::from_bits(self.shared.velocity_bits.load(Ordering::Relaxed))
    }

    /// Sample index of the most recent generated note-on.
    pub fn sample_index(&self) -> u32 {
        self.shared.sample_index.load(Ordering::Relaxed)
    }

    /// Whether a generated note is currently sounding.
    pub fn note_active(&self) -> bool {
        self.shared.note_active.load(Ordering::Relaxed)
    }
}

/// The audio-thread side. One instance per plugin instance; no globals.
pub struct GenerativeEngine {
    transport: TransportTracker,
    scheduler: NoteScheduler,
    selector: SampleSelector,
    rng: Rng,
    settings: Arc<ArcSwap<GeneratorSettings>>,
    command_rx: Receiver<EngineCommand>,
    shared: Arc<EngineShared>,
    out: EventBuffer,
}

impl GenerativeEngine {
    /// Builds an engine and its control handle. The seed makes every random
    /// decision reproducible.
    pub fn new(
        seed: u64,
        sample_pool_len: u32,
        initial_settings: GeneratorSettings,
    ) -> anyhow::Result<(Self, EngineHandle)> {
        initial_settings
            .validate()
            .context("invalid initial generator settings")?;

        let settings = Arc::new(ArcSwap::from_pointee(initial_settings));
        let shared = Arc::new(EngineShared {
            gate_bits: AtomicU32::new(0),
            velocity_bits: AtomicU32::new(0),
            sample_index: AtomicU32::new(0),
            note_active: AtomicBool::new(false),
        });
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_LEN);

        log::debug!("generative engine created, seed {seed}, pool {sample_pool_len}");

        let engine = Self {
            transport: TransportTracker::new(),
            scheduler: NoteScheduler::new(),
            selector: SampleSelector::new(sample_pool_len),
            rng: Rng::with_seed(seed),
            settings: settings.clone(),
            command_rx,
            shared: shared.clone(),
            out: EventBuffer::with_capacity(MAX_OUTPUT_EVENTS),
        };
        let handle = EngineHandle {
            settings,
            command_tx,
            shared,
        };
        Ok((engine, handle))
    }

    /// Runs one audio block and returns the events for it, ordered by frame.
    /// Call from the audio callback only; never re-entrant.
    pub fn process_block(
        &mut self,
        tempo: Option<f64>,
        ppq: Option<f64>,
        sample_position: u64,
        block_len: u32,
        sample_rate: f64,
        input: &[MidiEvent],
    ) -> &[OutputEvent] {
        self.out.clear();

        // Non-blocking command drain; the channel is bounded and lock-free.
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                EngineCommand::Reseed(seed) => self.rng = Rng::with_seed(seed),
                EngineCommand::ResetArpStep => self.scheduler.reset_arp(),
                EngineCommand::AllNotesOff => self.scheduler.all_notes_off(&mut self.out),
                EngineCommand::SetSamplePoolLen(len) => self.selector.set_pool_len(len),
            }
        }

        let snapshot =
            self.transport
                .update(tempo, ppq, sample_position, block_len, sample_rate);

        // One torn-free snapshot for the whole block.
        let settings = self.settings.load();
        self.scheduler.process_block(
            &snapshot,
            &settings,
            input,
            &mut self.selector,
            &mut self.rng,
            &mut self.out,
        );

        self.shared.gate_bits.store(
            self.scheduler.last_gate_percent().to_bits(),
            Ordering::Relaxed,
        );
        self.shared.velocity_bits.store(
            self.scheduler.last_velocity_percent().to_bits(),
            Ordering::Relaxed,
        );
        self.shared
            .sample_index
            .store(self.scheduler.current_sample_index(), Ordering::Relaxed);
        self.shared
            .note_active
            .store(self.scheduler.note_active(), Ordering::Relaxed);

        self.out.events()
    }

    /// Currently selected sample index, as seen by the audio thread.
    pub fn current_sample_index(&self) -> u32 {
        self.selector.current_index()
    }
}
