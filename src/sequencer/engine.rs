// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scheduling engine.
//!
//! Owns the active sequence and the transport state. `tick` is called once per
//! loop iteration with the current time; it advances steps from the internal
//! clock with drift compensation and turns gated notes off. External MIDI
//! clock pulses advance steps through `clock_pulse` instead.
//!
//! The engine is monophonic: at most one note is sounding at a time, and a
//! note still waiting for its gate to close is always turned off before the
//! next note is turned on.

use tracing::{debug, info};

use super::step::{clamp_transpose, Sequence, Step, GATE_MAX};
use super::NoteSink;
use crate::timing::{clamp_tempo, step_interval_ms, ClockSource, ExternalClock};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Index at 0, nothing sounding
    Stopped,
    Playing,
    /// Index and pending note-off kept for resuming
    Paused,
}

/// The note currently sounding and when it must be turned off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOff {
    /// The step as dispatched (transposed, clamped)
    pub step: Step,
    /// Nominal (drift-compensated) time the note started
    pub on_time: u64,
    /// Time at or after which the note-off is sent
    pub deadline: u64,
}

/// Construction parameters for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Steps in the sequence
    pub step_count: usize,
    /// Steps per quarter note (4 = 16th notes)
    pub steps_per_beat: u32,
    /// Initial tempo in BPM
    pub tempo: u32,
    /// Velocity used instead of each step's own, if set
    pub velocity_override: Option<u8>,
    /// Silence after which an external clock is abandoned. `None` = one quarter note.
    pub external_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_count: 8,
            steps_per_beat: 4,
            tempo: 120,
            velocity_override: None,
            external_timeout_ms: None,
        }
    }
}

/// Result of one external clock pulse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseReport {
    /// Step index advanced to, if this pulse hit a step boundary while playing
    pub advanced: Option<usize>,
    /// Tempo measured over the quarter note this pulse completed
    pub measured_tempo: Option<u32>,
}

/// The scheduling engine
#[derive(Debug)]
pub struct Engine {
    sequence: Sequence,
    /// Bank slot the sequence was last loaded from
    slot: usize,
    current_index: usize,
    tempo: u32,
    steps_per_beat: u32,
    transpose: i32,
    transport: Transport,
    /// Nominal time of the last advance; `None` fires on the next tick
    last_advance: Option<u64>,
    pending_off: Option<PendingOff>,
    clock: ClockSource,
    velocity_override: Option<u8>,
    external_timeout_ms: Option<u64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sequence(config.clone(), Sequence::filled(config.step_count, Step::default()))
    }

    pub fn with_sequence(config: EngineConfig, sequence: Sequence) -> Self {
        Self {
            sequence,
            slot: 0,
            current_index: 0,
            tempo: clamp_tempo(config.tempo as i64),
            steps_per_beat: config.steps_per_beat.max(1),
            transpose: 0,
            transport: Transport::Stopped,
            last_advance: None,
            pending_off: None,
            clock: ClockSource::Internal,
            velocity_override: config.velocity_override,
            external_timeout_ms: config.external_timeout_ms,
        }
    }

    // --- state access ---

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn step(&self, index: usize) -> Option<Step> {
        self.sequence.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.sequence.len()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Tempo to show the user: the measured one while externally clocked
    pub fn display_tempo(&self) -> u32 {
        match &self.clock {
            ClockSource::External(ext) => ext.measured_tempo().unwrap_or(self.tempo),
            ClockSource::Internal => self.tempo,
        }
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn pending_off(&self) -> Option<&PendingOff> {
        self.pending_off.as_ref()
    }

    pub fn clock_source(&self) -> &ClockSource {
        &self.clock
    }

    pub fn velocity_override(&self) -> Option<u8> {
        self.velocity_override
    }

    /// Internal step period in milliseconds
    pub fn step_interval_ms(&self) -> u64 {
        step_interval_ms(self.tempo, self.steps_per_beat)
    }

    /// Step period gate lengths are measured against
    fn gate_basis_ms(&self) -> u64 {
        match &self.clock {
            ClockSource::External(ext) => ext
                .measured_step_ms()
                .unwrap_or_else(|| self.step_interval_ms()),
            ClockSource::Internal => self.step_interval_ms(),
        }
    }

    fn external_timeout_ms(&self) -> u64 {
        self.external_timeout_ms
            .unwrap_or_else(|| self.step_interval_ms() * self.steps_per_beat as u64)
    }

    // --- transport ---

    /// Start or resume; the next tick advances immediately
    pub fn play(&mut self) {
        self.transport = Transport::Playing;
        self.last_advance = None;
        info!(index = self.current_index, tempo = self.tempo, "play");
    }

    /// Freeze the index. A sounding note still turns off at its deadline.
    pub fn pause(&mut self) {
        if self.transport == Transport::Playing {
            self.transport = Transport::Paused;
            info!(index = self.current_index, "pause");
        }
    }

    /// Flush any sounding note and rewind to step 0
    pub fn stop(&mut self, sink: &mut dyn NoteSink) {
        self.flush(sink);
        self.transport = Transport::Stopped;
        self.current_index = 0;
        self.last_advance = None;
        info!("stop");
    }

    /// Returns true if now playing
    pub fn toggle_play_pause(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.is_playing()
    }

    /// Turn off the pending note, if any, right now
    pub fn flush(&mut self, sink: &mut dyn NoteSink) {
        if let Some(pending) = self.pending_off.take() {
            sink.note_off(pending.step);
        }
    }

    // --- clocking ---

    /// Run one scheduling pass at time `now`.
    ///
    /// Returns the step index advanced to, if any.
    pub fn tick(&mut self, now: u64, sink: &mut dyn NoteSink) -> Option<usize> {
        if self.clock.external_expired(now, self.external_timeout_ms()) {
            info!("external clock lost, using internal clock");
            self.clock = ClockSource::Internal;
            self.last_advance = Some(now);
        }

        let mut advanced = None;
        let interval = self.step_interval_ms();

        if self.is_playing() && self.clock.should_advance(now, self.last_advance, interval) {
            let anchor = match self.last_advance {
                Some(last) => {
                    let delta = now.saturating_sub(last);
                    let overrun = delta.saturating_sub(interval);
                    // More than a whole step late: resync rather than burst
                    if overrun >= interval {
                        now
                    } else {
                        now - overrun
                    }
                }
                None => now,
            };
            self.last_advance = Some(anchor);
            advanced = Some(self.advance(anchor, interval, sink));
        }

        if let Some(pending) = self.pending_off {
            if now >= pending.deadline {
                self.pending_off = None;
                sink.note_off(pending.step);
            }
        }

        advanced
    }

    /// Count one incoming MIDI clock pulse.
    ///
    /// The first pulse switches the engine to external clocking.
    pub fn clock_pulse(&mut self, now: u64, sink: &mut dyn NoteSink) -> PulseReport {
        if !self.clock.is_external() {
            info!("external clock detected");
            self.clock = ClockSource::External(ExternalClock::new(self.steps_per_beat));
        }

        let outcome = match &mut self.clock {
            ClockSource::External(ext) => ext.pulse(now),
            ClockSource::Internal => return PulseReport::default(),
        };

        let mut report = PulseReport {
            advanced: None,
            measured_tempo: outcome.measured_tempo,
        };

        if outcome.advance && self.is_playing() {
            self.last_advance = Some(now);
            let basis = self.gate_basis_ms();
            report.advanced = Some(self.advance(now, basis, sink));
        }

        report
    }

    /// MIDI Start: count pulses from zero and play.
    ///
    /// If no pulse follows within the external timeout, the internal clock
    /// takes over again.
    pub fn external_start(&mut self, now: u64) {
        self.reset_external(now);
        self.play();
    }

    /// MIDI Continue: play without resetting the pulse count
    pub fn external_continue(&mut self, now: u64) {
        if let ClockSource::External(ext) = &mut self.clock {
            ext.arm(now);
        }
        self.play();
    }

    /// MIDI Stop: count pulses from zero and stop
    pub fn external_stop(&mut self, now: u64, sink: &mut dyn NoteSink) {
        self.reset_external(now);
        self.stop(sink);
    }

    fn reset_external(&mut self, now: u64) {
        if !self.clock.is_external() {
            self.clock = ClockSource::External(ExternalClock::new(self.steps_per_beat));
        }
        if let ClockSource::External(ext) = &mut self.clock {
            ext.reset();
            ext.arm(now);
        }
    }

    /// Move to the next step and sound it. `anchor` is the nominal step time.
    fn advance(&mut self, anchor: u64, basis_ms: u64, sink: &mut dyn NoteSink) -> usize {
        self.current_index = (self.current_index + 1) % self.sequence.len();

        let mut step = self
            .sequence
            .get(self.current_index)
            .unwrap_or_default()
            .transposed(self.transpose);
        if let Some(velocity) = self.velocity_override {
            step = step.with_velocity(velocity);
        }

        // Monophonic: the previous note always ends before the next begins
        self.flush(sink);
        sink.note_on(step);

        let gate_ms = (basis_ms * step.gate as u64 / GATE_MAX as u64).max(1);
        self.pending_off = Some(PendingOff {
            step,
            on_time: anchor,
            deadline: anchor + gate_ms,
        });

        debug!(
            index = self.current_index,
            note = step.note,
            gate = step.gate,
            enabled = step.enabled,
            "step"
        );
        self.current_index
    }

    // --- edits ---

    /// Replace a step wholesale. Out-of-range indexes are ignored.
    pub fn set_step(&mut self, index: usize, step: Step) -> Option<Step> {
        if self.sequence.set(index, step) {
            Some(step)
        } else {
            None
        }
    }

    pub fn set_note(&mut self, index: usize, note: i32) -> Option<Step> {
        let step = self.step(index)?.with_note(note);
        self.set_step(index, step)
    }

    pub fn adjust_note(&mut self, index: usize, delta: i32) -> Option<Step> {
        let note = self.step(index)?.note as i32 + delta;
        self.set_note(index, note)
    }

    pub fn set_gate(&mut self, index: usize, gate: i32) -> Option<Step> {
        let step = self.step(index)?.with_gate(gate);
        self.set_step(index, step)
    }

    pub fn adjust_gate(&mut self, index: usize, delta: i32) -> Option<Step> {
        let gate = self.step(index)?.gate as i32 + delta;
        self.set_gate(index, gate)
    }

    pub fn toggle_enabled(&mut self, index: usize) -> Option<Step> {
        let step = self.step(index)?.toggled();
        self.set_step(index, step)
    }

    /// Set the tempo, clamped to at least 1 BPM. Returns the stored value.
    pub fn set_tempo(&mut self, bpm: i64) -> u32 {
        self.tempo = clamp_tempo(bpm);
        debug!(tempo = self.tempo, "tempo");
        self.tempo
    }

    pub fn adjust_tempo(&mut self, delta: i32) -> u32 {
        self.set_tempo(self.tempo as i64 + delta as i64)
    }

    /// Set the transpose, clamped to ±36 semitones. Returns the stored value.
    pub fn set_transpose(&mut self, semitones: i32) -> i32 {
        self.transpose = clamp_transpose(semitones);
        debug!(transpose = self.transpose, "transpose");
        self.transpose
    }

    pub fn adjust_transpose(&mut self, delta: i32) -> i32 {
        self.set_transpose(self.transpose.saturating_add(delta))
    }

    pub fn set_velocity_override(&mut self, velocity: Option<u8>) {
        self.velocity_override = velocity.map(|v| v.min(127));
    }

    /// Replace the active sequence wholesale with `sequence` from bank `slot`
    pub fn load_sequence(&mut self, sequence: Sequence, slot: usize) {
        self.sequence = sequence;
        self.slot = slot;
        if self.current_index >= self.sequence.len() {
            self.current_index = 0;
        }
        info!(slot, "sequence loaded");
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{NoteEvent, RecordingSink};

    fn engine_at(tempo: u32) -> Engine {
        Engine::new(EngineConfig {
            tempo,
            ..Default::default()
        })
    }

    fn run(engine: &mut Engine, sink: &mut RecordingSink, from: u64, to: u64, every: u64) -> usize {
        let mut advances = 0;
        let mut now = from;
        while now <= to {
            if engine.tick(now, sink).is_some() {
                advances += 1;
            }
            now += every;
        }
        advances
    }

    #[test]
    fn test_engine_defaults() {
        let engine = Engine::default();
        assert_eq!(engine.tempo(), 120);
        assert_eq!(engine.step_count(), 8);
        assert_eq!(engine.transport(), Transport::Stopped);
        assert_eq!(engine.current_index(), 0);
        assert!(engine.pending_off().is_none());
        assert_eq!(engine.step_interval_ms(), 125);
    }

    #[test]
    fn test_stopped_engine_does_not_advance() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        assert_eq!(run(&mut engine, &mut sink, 0, 1_000, 10), 0);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_eight_advances_per_second_at_120() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        assert_eq!(run(&mut engine, &mut sink, 0, 1_000, 10), 8);
    }

    #[test]
    fn test_play_fires_immediately() {
        let mut engine = engine_at(60);
        let mut sink = RecordingSink::new();
        engine.play();
        assert_eq!(engine.tick(5_000, &mut sink), Some(1));
        assert_eq!(sink.ons(), 1);
    }

    #[test]
    fn test_drift_compensation_keeps_average_period() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        // Ticks every 7ms never land on a 125ms boundary; the average must hold
        let advances = run(&mut engine, &mut sink, 0, 10_000, 7);
        assert!((80..=81).contains(&advances), "advances = {}", advances);
    }

    #[test]
    fn test_late_tick_anchors_to_nominal_time() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        engine.tick(0, &mut sink);
        engine.tick(140, &mut sink);
        let pending = engine.pending_off().unwrap();
        assert_eq!(pending.on_time, 125);
    }

    #[test]
    fn test_wraparound() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        let start = engine.current_index();
        let mut now = 0;
        let mut advances = 0;
        while advances < engine.step_count() {
            if engine.tick(now, &mut sink).is_some() {
                advances += 1;
            }
            now += 5;
        }
        assert_eq!(engine.current_index(), start);
    }

    #[test]
    fn test_gate_turns_note_off_before_next_step() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.set_gate(1, 8);
        engine.play();
        engine.tick(0, &mut sink);
        // Half gate of 125ms
        let pending = *engine.pending_off().unwrap();
        assert_eq!(pending.deadline, 62);

        engine.tick(61, &mut sink);
        assert_eq!(sink.offs(), 0);
        engine.tick(62, &mut sink);
        assert_eq!(sink.offs(), 1);
        assert!(engine.pending_off().is_none());
    }

    #[test]
    fn test_full_gate_off_precedes_next_on() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        for i in 0..8 {
            engine.set_gate(i, 16);
        }
        engine.play();
        run(&mut engine, &mut sink, 0, 500, 1);

        // Strict alternation: on, off, on, off...
        for (i, event) in sink.events.iter().enumerate() {
            assert_eq!(event.is_on(), i % 2 == 0, "event {} out of order", i);
        }
    }

    #[test]
    fn test_gate_bound() {
        for tempo in [1u32, 60, 120, 300, 999] {
            for gate in 1..=16 {
                let mut engine = engine_at(tempo);
                let mut sink = RecordingSink::new();
                engine.set_gate(1, gate);
                engine.play();
                engine.tick(0, &mut sink);
                let pending = engine.pending_off().unwrap();
                let length = pending.deadline - pending.on_time;
                assert!(length > 0);
                assert!(length <= engine.step_interval_ms());
            }
        }
    }

    #[test]
    fn test_transpose_applied_and_clamped() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.set_note(1, 100);
        assert_eq!(engine.set_transpose(50), 36);
        engine.play();
        engine.tick(0, &mut sink);
        assert_eq!(sink.events[0], NoteEvent::On(Step::new(127, 127, 8, true)));
        // Stored pitch is untouched
        assert_eq!(engine.step(1).unwrap().note, 100);
    }

    #[test]
    fn test_transpose_clamp_range() {
        let mut engine = Engine::default();
        assert_eq!(engine.set_transpose(-100), -36);
        assert_eq!(engine.adjust_transpose(200), 36);
        assert_eq!(engine.adjust_transpose(-1), 35);
    }

    #[test]
    fn test_tempo_floor() {
        let mut engine = Engine::default();
        assert_eq!(engine.set_tempo(0), 1);
        assert_eq!(engine.set_tempo(-20), 1);
        assert_eq!(engine.adjust_tempo(-5), 1);
        assert_eq!(engine.step_interval_ms(), 15_000);
    }

    #[test]
    fn test_velocity_override() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.set_velocity_override(Some(64));
        engine.play();
        engine.tick(0, &mut sink);
        assert_eq!(sink.events[0].step().velocity, 64);
    }

    #[test]
    fn test_pause_keeps_index_and_pending() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        engine.tick(0, &mut sink);
        engine.tick(130, &mut sink);
        let index = engine.current_index();

        engine.pause();
        assert_eq!(engine.transport(), Transport::Paused);
        assert!(engine.pending_off().is_some());

        // No advance while paused, but the gate still closes
        run(&mut engine, &mut sink, 131, 2_000, 10);
        assert_eq!(engine.current_index(), index);
        assert_eq!(sink.ons(), sink.offs());

        engine.play();
        assert_eq!(engine.tick(2_001, &mut sink), Some(index + 1));
    }

    #[test]
    fn test_stop_flushes_and_rewinds() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        for i in 0..8 {
            engine.set_gate(i, 16);
        }
        engine.play();
        run(&mut engine, &mut sink, 0, 300, 10);
        assert!(engine.pending_off().is_some());

        engine.stop(&mut sink);
        assert_eq!(engine.transport(), Transport::Stopped);
        assert_eq!(engine.current_index(), 0);
        assert!(engine.pending_off().is_none());
        assert_eq!(sink.ons(), sink.offs());
    }

    #[test]
    fn test_toggle_play_pause() {
        let mut engine = Engine::default();
        assert!(engine.toggle_play_pause());
        assert!(!engine.toggle_play_pause());
        assert_eq!(engine.transport(), Transport::Paused);
    }

    #[test]
    fn test_edits_clamp_and_ignore_bad_index() {
        let mut engine = Engine::default();
        assert_eq!(engine.set_note(0, 500).unwrap().note, 127);
        assert_eq!(engine.adjust_note(0, -500).unwrap().note, 1);
        assert_eq!(engine.set_gate(0, 0).unwrap().gate, 1);
        assert_eq!(engine.adjust_gate(0, 40).unwrap().gate, 16);
        assert!(!engine.toggle_enabled(0).unwrap().enabled);
        assert!(engine.set_note(8, 60).is_none());
        assert!(engine.toggle_enabled(99).is_none());
    }

    #[test]
    fn test_load_sequence_replaces_wholesale() {
        let mut engine = Engine::default();
        let seq = Sequence::filled(8, Step::new(48, 90, 4, false));
        engine.load_sequence(seq.clone(), 5);
        assert_eq!(engine.sequence(), &seq);
        assert_eq!(engine.slot(), 5);
    }

    #[test]
    fn test_external_pulses_drive_advance() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        assert!(engine.clock_source().is_external());

        let mut advances = 0;
        for i in 1..=24u64 {
            if engine.clock_pulse(i * 20, &mut sink).advanced.is_some() {
                advances += 1;
            }
        }
        assert_eq!(advances, 4);

        // Time alone does not advance while externally clocked
        let before = engine.current_index();
        engine.tick(490, &mut sink);
        assert_eq!(engine.current_index(), before);
    }

    #[test]
    fn test_external_measured_tempo_is_display_only() {
        let mut engine = engine_at(100);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        let mut measured = None;
        for i in 1..=48u64 {
            let report = engine.clock_pulse(i * 500 / 24, &mut sink);
            if report.measured_tempo.is_some() {
                measured = report.measured_tempo;
            }
        }
        assert_eq!(measured, Some(120));
        assert_eq!(engine.display_tempo(), 120);
        assert_eq!(engine.tempo(), 100);
    }

    #[test]
    fn test_external_clock_falls_back_to_internal() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        engine.clock_pulse(100, &mut sink);
        // Default timeout is one quarter note (500ms at 120)
        engine.tick(400, &mut sink);
        assert!(engine.clock_source().is_external());
        engine.tick(700, &mut sink);
        assert!(!engine.clock_source().is_external());
    }

    #[test]
    fn test_external_stop_rewinds() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        for i in 1..=12u64 {
            engine.clock_pulse(i * 20, &mut sink);
        }
        engine.external_stop(300, &mut sink);
        assert_eq!(engine.current_index(), 0);
        assert!(!engine.is_playing());
        assert_eq!(sink.ons(), sink.offs());
    }

    #[test]
    fn test_start_without_pulses_falls_back_to_internal() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        assert!(engine.is_playing());
        assert!(engine.clock_source().is_external());

        let mut now = 0;
        while now <= 2_000 {
            engine.tick(now, &mut sink);
            now += 10;
        }
        assert!(!engine.clock_source().is_external());
        assert!(sink.ons() > 0);
    }

    #[test]
    fn test_continue_rearms_silence_window() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.external_start(0);
        engine.clock_pulse(10, &mut sink);
        engine.pause();
        engine.external_continue(5_000);
        engine.tick(5_100, &mut sink);
        assert!(engine.clock_source().is_external());
        engine.tick(5_600, &mut sink);
        assert!(!engine.clock_source().is_external());
    }

    #[test]
    fn test_late_tick_resyncs_to_now() {
        let mut engine = engine_at(120);
        let mut sink = RecordingSink::new();
        engine.play();
        engine.tick(0, &mut sink);

        // Two and a half intervals late: the step lands on `now`, not a past anchor
        engine.tick(125 + 310, &mut sink);
        let pending = engine.pending_off().copied().unwrap();
        assert_eq!(pending.on_time, 435);
        assert_eq!(pending.deadline, 435 + 62);
        assert_eq!(sink.ons(), 2);

        // Slightly late ticks keep the drift-compensated anchor
        engine.tick(435 + 130, &mut sink);
        assert_eq!(engine.pending_off().unwrap().on_time, 435 + 125);
    }
}
