// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for scheduling and playing steps.
//!
//! This module provides the core sequencing infrastructure:
//! - Step and sequence data model
//! - Scheduling engine with drift-corrected step advance and gate-off bookkeeping
//! - Sequence bank with deep-copied slots
//! - The `NoteSink` seam that note dispatches flow through

pub mod bank;
pub mod engine;
pub mod step;

pub use bank::{SequenceBank, DEFAULT_SLOT_COUNT};
pub use engine::{Engine, EngineConfig, PendingOff, PulseReport, Transport};
pub use step::{Sequence, Step};

/// Receiver of note dispatches.
///
/// The engine calls `note_on` with the step as it should sound (transposed
/// and clamped) and later calls `note_off` with the same step. Disabled steps
/// are dispatched too; deciding whether a muted step makes sound is up to
/// the sink.
pub trait NoteSink {
    fn note_on(&mut self, step: Step);
    fn note_off(&mut self, step: Step);

    /// Single-byte real-time message (clock, start, stop). Ignored by default.
    fn realtime(&mut self, _status: u8) {}
}

/// Sends every dispatch to each inner sink in order
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn NoteSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl NoteSink + 'static) -> Self {
        self.push(sink);
        self
    }

    pub fn push(&mut self, sink: impl NoteSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NoteSink for FanOutSink {
    fn note_on(&mut self, step: Step) {
        for sink in &mut self.sinks {
            sink.note_on(step);
        }
    }

    fn note_off(&mut self, step: Step) {
        for sink in &mut self.sinks {
            sink.note_off(step);
        }
    }

    fn realtime(&mut self, status: u8) {
        for sink in &mut self.sinks {
            sink.realtime(status);
        }
    }
}

/// A dispatched note event, as captured by `RecordingSink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On(Step),
    Off(Step),
}

impl NoteEvent {
    pub fn step(&self) -> Step {
        match self {
            NoteEvent::On(step) | NoteEvent::Off(step) => *step,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, NoteEvent::On(_))
    }
}

/// Sink that records every dispatch, for tests and headless runs
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<NoteEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ons(&self) -> usize {
        self.events.iter().filter(|e| e.is_on()).count()
    }

    pub fn offs(&self) -> usize {
        self.events.iter().filter(|e| !e.is_on()).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl NoteSink for RecordingSink {
    fn note_on(&mut self, step: Step) {
        self.events.push(NoteEvent::On(step));
    }

    fn note_off(&mut self, step: Step) {
        self.events.push(NoteEvent::Off(step));
    }
}
