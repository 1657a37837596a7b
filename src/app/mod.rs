// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The sequencer context.
//!
//! `Sequencer` owns every piece of mutable state: the engine, the bank, the
//! gesture interpreter, the throttled store and the display outbox. The run
//! loop calls `handle_midi` for each incoming message and `step` once per
//! iteration, passing the current time and the note sink explicitly.

use tracing::{debug, error, info};

use crate::config::Config;
use crate::control::{ControlAction, InputFrame, InputInterpreter};
use crate::display::DisplayEvent;
use crate::midi::{messages, MidiMessage};
use crate::sequencer::{Engine, NoteSink, SequenceBank, Step};
use crate::storage::{load_bank_or_default, SequenceStore, WriteThrottle};
use crate::timing::{ClockOutput, ClockState};

/// Follow-up work the loop owner should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Playback paused: write the bank to storage
    Persist,
}

/// Explicit context for one sequencer instance
pub struct Sequencer {
    config: Config,
    engine: Engine,
    bank: SequenceBank,
    interpreter: InputInterpreter,
    store: Box<dyn SequenceStore>,
    throttle: WriteThrottle,
    /// MIDI clock generator, when clock output is enabled
    clock_out: Option<ClockOutput>,
    /// Step index and note currently sounding for audition
    preview: Option<(usize, Step)>,
    outbox: Vec<DisplayEvent>,
}

impl Sequencer {
    /// Build from config, reading the bank from `store` (defaults on failure)
    pub fn new(config: Config, mut store: Box<dyn SequenceStore>) -> Self {
        let bank = load_bank_or_default(
            store.as_mut(),
            config.slot_count,
            config.step_count,
            config.default_step(),
        );
        Self::with_bank(config, bank, store)
    }

    pub fn with_bank(config: Config, mut bank: SequenceBank, store: Box<dyn SequenceStore>) -> Self {
        let mut engine = Engine::new(config.engine_config());
        if let Some(sequence) = bank.load(0) {
            engine.load_sequence(sequence, 0);
        }

        let clock_out = config.send_clock.then(|| ClockOutput::new(engine.tempo()));
        let interpreter = InputInterpreter::new(config.key_map.clone(), config.gesture_timings());
        let throttle = WriteThrottle::new(config.write_cooldown_ms);

        Self {
            config,
            engine,
            bank,
            interpreter,
            store,
            throttle,
            clock_out,
            preview: None,
            outbox: vec![DisplayEvent::All],
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn bank(&self) -> &SequenceBank {
        &self.bank
    }

    pub fn interpreter(&self) -> &InputInterpreter {
        &self.interpreter
    }

    pub fn clock_output(&self) -> Option<&ClockOutput> {
        self.clock_out.as_ref()
    }

    /// Step sounding for audition, if any
    pub fn preview(&self) -> Option<Step> {
        self.preview.map(|(_, step)| step)
    }

    /// Take every display event queued since the last call
    pub fn drain_display(&mut self) -> Vec<DisplayEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Feed one incoming MIDI message
    pub fn handle_midi(&mut self, message: &MidiMessage, now: u64, sink: &mut dyn NoteSink) {
        match message {
            MidiMessage::TimingClock => {
                let report = self.engine.clock_pulse(now, sink);
                if let Some(index) = report.advanced {
                    self.outbox.push(DisplayEvent::PlayheadMoved(index));
                }
                if let Some(tempo) = report.measured_tempo {
                    self.outbox.push(DisplayEvent::TempoChanged(tempo));
                }
            }
            MidiMessage::Start => {
                self.end_preview(sink);
                self.engine.external_start(now);
                self.outbox.push(DisplayEvent::PlayingChanged(true));
            }
            MidiMessage::Continue => {
                self.end_preview(sink);
                self.engine.external_continue(now);
                self.outbox.push(DisplayEvent::PlayingChanged(true));
            }
            MidiMessage::Stop => {
                self.engine.external_stop(now, sink);
                self.outbox.push(DisplayEvent::PlayingChanged(false));
                self.outbox.push(DisplayEvent::PlayheadMoved(0));
            }
            other => debug!(?other, "MIDI input ignored"),
        }
    }

    /// Run one loop iteration: schedule, emit clock, then interpret input
    pub fn step(&mut self, frame: InputFrame, now: u64, sink: &mut dyn NoteSink) -> Option<Request> {
        if let Some(index) = self.engine.tick(now, sink) {
            self.outbox.push(DisplayEvent::PlayheadMoved(index));
        }
        self.emit_clock(now, sink);

        let actions = self.interpreter.process(frame, now, self.engine.is_playing());
        let mut request = None;
        for action in actions {
            if let Some(r) = self.apply(action, now, sink) {
                request = Some(r);
            }
        }
        request
    }

    /// Apply one resolved gesture
    pub fn apply(&mut self, action: ControlAction, now: u64, sink: &mut dyn NoteSink) -> Option<Request> {
        match action {
            ControlAction::TogglePlay => return self.toggle_play(now, sink),

            ControlAction::AdjustTempo(delta) => {
                let tempo = self.engine.adjust_tempo(delta);
                if let Some(clock) = &mut self.clock_out {
                    clock.set_bpm(tempo, now);
                }
                self.outbox.push(DisplayEvent::TempoChanged(tempo));
            }
            ControlAction::AdjustTranspose(delta) => {
                let transpose = self.engine.adjust_transpose(delta);
                self.outbox.push(DisplayEvent::TransposeChanged(transpose));
            }

            ControlAction::AdjustNote { step, delta, preview } => {
                if let Some(edited) = self.engine.adjust_note(step, delta) {
                    if preview {
                        self.start_preview(step, edited, sink);
                    }
                    self.step_changed(step, true);
                }
            }
            ControlAction::AdjustGate { step, delta } => {
                if self.engine.adjust_gate(step, delta).is_some() {
                    self.step_changed(step, true);
                }
            }
            ControlAction::ToggleStep(step) => {
                if let Some(toggled) = self.engine.toggle_enabled(step) {
                    debug!(step, enabled = toggled.enabled, "step toggled");
                    self.step_changed(step, true);
                }
            }
            ControlAction::SelectStep { step, selected } => self.step_changed(step, selected),
            ControlAction::PreviewOn(step) => {
                if let Some(current) = self.engine.step(step) {
                    self.start_preview(step, current, sink);
                }
            }
            ControlAction::PreviewOff(step) => {
                // A replaced key may be released while another still auditions
                if self.preview.is_some_and(|(index, _)| index == step) {
                    self.end_preview(sink);
                }
            }

            ControlAction::LoadSlot(slot) => {
                if let Some(sequence) = self.bank.load(slot) {
                    self.engine.load_sequence(sequence, slot);
                    info!(slot, "loaded sequence");
                    self.outbox.push(DisplayEvent::SlotChanged(slot));
                    self.outbox.push(DisplayEvent::All);
                }
            }
            ControlAction::SaveSlot(slot) => {
                if self.bank.save(slot, self.engine.sequence()) {
                    info!(slot, "saved sequence");
                    self.outbox.push(DisplayEvent::Saved(slot));
                }
            }
            ControlAction::PendingSave(slot) => self.outbox.push(DisplayEvent::PendingSave(slot)),
        }
        None
    }

    /// Write the bank to storage if the cooldown allows. Returns true if written.
    pub fn persist(&mut self, now: u64) -> bool {
        if !self.throttle.try_acquire(now) {
            return false;
        }
        match self.store.write_all(self.bank.sequences()) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to write saved sequences");
                false
            }
        }
    }

    /// Run `body` against this sequencer, then shut down whatever it returned.
    ///
    /// An early error return from the loop body still silences every note.
    pub fn run_until_done<S, R>(
        &mut self,
        sink: &mut S,
        body: impl FnOnce(&mut Self, &mut S) -> R,
    ) -> R
    where
        S: NoteSink,
    {
        let result = body(self, sink);
        self.shutdown(sink);
        result
    }

    /// Silence everything and stop the transport
    pub fn shutdown(&mut self, sink: &mut dyn NoteSink) {
        self.end_preview(sink);
        self.engine.stop(sink);
        if let Some(clock) = &mut self.clock_out {
            if clock.state() != ClockState::Stopped {
                sink.realtime(clock.stop()[0]);
            }
        }
        self.outbox.push(DisplayEvent::PlayingChanged(false));
    }

    fn toggle_play(&mut self, now: u64, sink: &mut dyn NoteSink) -> Option<Request> {
        let playing = self.engine.toggle_play_pause();
        self.outbox.push(DisplayEvent::PlayingChanged(playing));

        // Clock output only leads when nothing external is driving us
        let external = self.engine.clock_source().is_external();
        if let Some(clock) = self.clock_out.as_mut().filter(|_| !external) {
            let status = if playing {
                match clock.state() {
                    ClockState::Paused => clock.continue_playback(now),
                    _ => clock.start(now),
                }
            } else {
                clock.pause()
            };
            sink.realtime(status[0]);
        }

        if playing {
            self.end_preview(sink);
            None
        } else {
            Some(Request::Persist)
        }
    }

    fn emit_clock(&mut self, now: u64, sink: &mut dyn NoteSink) {
        let external = self.engine.clock_source().is_external();
        let Some(clock) = &mut self.clock_out else {
            return;
        };
        // Keep the pulse schedule current even while following, so it never bursts later
        let due = clock.tick(now);
        if !external {
            for _ in 0..due {
                sink.realtime(messages::TIMING_CLOCK);
            }
        }
    }

    /// Sound step `index` for audition, ending any earlier audition and any
    /// note left sounding by a pause first
    fn start_preview(&mut self, index: usize, step: Step, sink: &mut dyn NoteSink) {
        self.end_preview(sink);
        if !self.engine.is_playing() {
            self.engine.flush(sink);
        }
        let step = match self.engine.velocity_override() {
            Some(velocity) => step.with_velocity(velocity),
            None => step,
        };
        sink.note_on(step);
        self.preview = Some((index, step));
    }

    fn end_preview(&mut self, sink: &mut dyn NoteSink) {
        if let Some((_, step)) = self.preview.take() {
            sink.note_off(step);
        }
    }

    fn step_changed(&mut self, index: usize, selected: bool) {
        if let Some(step) = self.engine.step(index) {
            self.outbox.push(DisplayEvent::StepChanged {
                index,
                step,
                selected,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{EncoderEdge, KeyEdge};
    use crate::sequencer::{NoteEvent, RecordingSink, Sequence, Transport};
    use crate::storage::MemoryStore;

    fn sequencer() -> Sequencer {
        Sequencer::new(Config::default(), Box::new(MemoryStore::new()))
    }

    fn frame_key(edge: KeyEdge) -> InputFrame {
        InputFrame::key(edge)
    }

    #[test]
    fn test_new_loads_slot_zero_and_requests_full_redraw() {
        let mut seq = sequencer();
        assert_eq!(seq.engine().tempo(), 100);
        assert_eq!(seq.bank().len(), 8);
        assert_eq!(seq.engine().slot(), 0);
        assert_eq!(seq.drain_display(), vec![DisplayEvent::All]);
        assert!(seq.drain_display().is_empty());
    }

    #[test]
    fn test_new_reads_saved_bank() {
        let mut store = MemoryStore::new();
        let first = Sequence::filled(8, Step::new(48, 100, 4, true));
        store.sequences = Some(vec![first.clone(); 8]);
        let seq = Sequencer::new(Config::default(), Box::new(store));
        assert_eq!(seq.engine().sequence(), &first);
    }

    #[test]
    fn test_encoder_tap_plays_and_pauses() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();

        seq.step(InputFrame::encoder(EncoderEdge::Pressed), 0, &mut sink);
        assert_eq!(seq.step(InputFrame::encoder(EncoderEdge::Released), 100, &mut sink), None);
        assert!(seq.engine().is_playing());

        seq.step(InputFrame::encoder(EncoderEdge::Pressed), 1_000, &mut sink);
        let request = seq.step(InputFrame::encoder(EncoderEdge::Released), 1_100, &mut sink);
        assert_eq!(request, Some(Request::Persist));
        assert_eq!(seq.engine().transport(), Transport::Paused);
    }

    #[test]
    fn test_persist_is_throttled() {
        let mut seq = sequencer();
        assert!(seq.persist(0));
        assert!(!seq.persist(2_000));
        assert!(seq.persist(10_000));
    }

    #[test]
    fn test_turn_transposes_and_reports() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.drain_display();
        seq.step(InputFrame::turn(3), 0, &mut sink);
        assert_eq!(seq.engine().transpose(), 3);
        assert_eq!(seq.drain_display(), vec![DisplayEvent::TransposeChanged(3)]);
    }

    #[test]
    fn test_preview_while_stopped() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();

        seq.step(frame_key(KeyEdge::Pressed(2)), 0, &mut sink);
        assert_eq!(seq.preview().map(|s| s.note), Some(60));

        // Editing re-sounds at the new pitch
        seq.step(InputFrame::turn(2), 10, &mut sink);
        assert_eq!(
            sink.events,
            vec![
                NoteEvent::On(Step::new(60, 127, 8, true)),
                NoteEvent::Off(Step::new(60, 127, 8, true)),
                NoteEvent::On(Step::new(62, 127, 8, true)),
            ]
        );

        seq.step(frame_key(KeyEdge::Released(2)), 200, &mut sink);
        assert_eq!(sink.events.last(), Some(&NoteEvent::Off(Step::new(62, 127, 8, true))));
        assert!(seq.preview().is_none());
        assert_eq!(seq.engine().step(2).unwrap().note, 62);
    }

    #[test]
    fn test_preview_ignores_transpose() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().set_transpose(12);
        seq.step(frame_key(KeyEdge::Pressed(0)), 0, &mut sink);
        assert_eq!(sink.events[0].step().note, 60);
    }

    #[test]
    fn test_key_tap_while_playing_mutes() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().play();

        seq.step(frame_key(KeyEdge::Pressed(4)), 0, &mut sink);
        seq.step(frame_key(KeyEdge::Released(4)), 50, &mut sink);
        assert!(!seq.engine().step(4).unwrap().enabled);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().set_note(0, 72);

        // Push, hold key 3 past the hold window, release: save
        seq.step(InputFrame::encoder(EncoderEdge::Pressed), 0, &mut sink);
        seq.step(frame_key(KeyEdge::Pressed(3)), 10, &mut sink);
        seq.step(InputFrame::default(), 1_200, &mut sink);
        seq.step(frame_key(KeyEdge::Released(3)), 1_300, &mut sink);
        seq.step(InputFrame::encoder(EncoderEdge::Released), 1_400, &mut sink);

        let events = seq.drain_display();
        assert!(events.contains(&DisplayEvent::PendingSave(3)));
        assert!(events.contains(&DisplayEvent::Saved(3)));
        assert_eq!(seq.bank().get(3).unwrap().get(0).unwrap().note, 72);
        assert_eq!(seq.bank().get(0).unwrap().get(0).unwrap().note, 60);

        // Edit the live copy, then load slot 3 back
        seq.engine_mut().set_note(0, 40);
        seq.step(InputFrame::encoder(EncoderEdge::Pressed), 2_000, &mut sink);
        seq.step(frame_key(KeyEdge::Pressed(3)), 2_010, &mut sink);
        seq.step(frame_key(KeyEdge::Released(3)), 2_100, &mut sink);

        assert_eq!(seq.engine().step(0).unwrap().note, 72);
        assert_eq!(seq.engine().slot(), 3);
        let events = seq.drain_display();
        assert!(events.contains(&DisplayEvent::SlotChanged(3)));
        assert!(events.contains(&DisplayEvent::All));
    }

    #[test]
    fn test_external_clock_messages() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();

        seq.handle_midi(&MidiMessage::Start, 0, &mut sink);
        assert!(seq.engine().is_playing());
        for i in 1..=6u64 {
            seq.handle_midi(&MidiMessage::TimingClock, i * 20, &mut sink);
        }
        assert_eq!(sink.ons(), 1);

        seq.handle_midi(&MidiMessage::Stop, 200, &mut sink);
        assert!(!seq.engine().is_playing());
        assert_eq!(seq.engine().current_index(), 0);
        assert_eq!(sink.ons(), sink.offs());
    }

    #[derive(Default)]
    struct ClockSink {
        bytes: Vec<u8>,
    }

    impl NoteSink for ClockSink {
        fn note_on(&mut self, _step: Step) {}
        fn note_off(&mut self, _step: Step) {}
        fn realtime(&mut self, status: u8) {
            self.bytes.push(status);
        }
    }

    #[test]
    fn test_clock_output_follows_transport() {
        let config = Config {
            send_clock: true,
            tempo: 120,
            ..Default::default()
        };
        let mut seq = Sequencer::new(config, Box::new(MemoryStore::new()));
        let mut sink = ClockSink::default();

        seq.apply(ControlAction::TogglePlay, 0, &mut sink);
        assert_eq!(sink.bytes, vec![messages::START]);

        // 120 BPM: 48 pulses per second
        seq.step(InputFrame::default(), 1_000, &mut sink);
        let clocks = sink.bytes.iter().filter(|b| **b == messages::TIMING_CLOCK).count();
        assert_eq!(clocks, 48);

        seq.apply(ControlAction::TogglePlay, 1_010, &mut sink);
        assert_eq!(sink.bytes.last(), Some(&messages::STOP));
        seq.apply(ControlAction::TogglePlay, 1_020, &mut sink);
        assert_eq!(sink.bytes.last(), Some(&messages::CONTINUE));
    }

    #[test]
    fn test_shutdown_silences_everything() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().play();
        seq.step(InputFrame::default(), 0, &mut sink);
        seq.shutdown(&mut sink);
        assert_eq!(sink.ons(), sink.offs());
        assert_eq!(seq.engine().transport(), Transport::Stopped);
    }

    #[test]
    fn test_releasing_replaced_key_keeps_new_audition() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().set_note(2, 64);

        seq.step(frame_key(KeyEdge::Pressed(1)), 0, &mut sink);
        seq.step(frame_key(KeyEdge::Pressed(2)), 10, &mut sink);
        seq.step(frame_key(KeyEdge::Released(1)), 20, &mut sink);

        let c4 = Step::new(60, 127, 8, true);
        let e4 = Step::new(64, 127, 8, true);
        assert_eq!(
            sink.events,
            vec![NoteEvent::On(c4), NoteEvent::Off(c4), NoteEvent::On(e4)]
        );
        assert_eq!(seq.preview(), Some(e4));

        seq.step(frame_key(KeyEdge::Released(2)), 30, &mut sink);
        assert_eq!(sink.events.last(), Some(&NoteEvent::Off(e4)));
        assert!(seq.preview().is_none());
    }

    #[test]
    fn test_audition_while_paused_ends_sounding_step_first() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.engine_mut().set_note(5, 67);
        seq.engine_mut().play();
        seq.step(InputFrame::default(), 0, &mut sink);
        seq.engine_mut().pause();
        assert!(seq.engine().pending_off().is_some());

        seq.step(frame_key(KeyEdge::Pressed(5)), 10, &mut sink);
        assert!(seq.engine().pending_off().is_none());
        assert_monophonic(&sink.events);
        assert_eq!(sink.events.last(), Some(&NoteEvent::On(Step::new(67, 127, 8, true))));
    }

    #[test]
    fn test_start_without_clock_falls_back_to_internal() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();
        seq.handle_midi(&MidiMessage::Start, 0, &mut sink);

        let mut now = 0;
        while now <= 10_000 {
            seq.step(InputFrame::default(), now, &mut sink);
            now += 10;
        }
        assert!(seq.engine().is_playing());
        assert!(!seq.engine().clock_source().is_external());
        assert!(sink.ons() > 0);
    }

    fn assert_monophonic(events: &[NoteEvent]) {
        let mut sounding = 0;
        for event in events {
            sounding += if event.is_on() { 1 } else { -1 };
            assert!((0..=1).contains(&sounding), "overlapping notes in {:?}", events);
        }
    }

    #[test]
    fn test_loop_error_still_silences_notes() {
        let mut seq = sequencer();
        let mut sink = RecordingSink::new();

        let result: Result<(), &str> = seq.run_until_done(&mut sink, |seq, sink| {
            seq.engine_mut().play();
            seq.step(InputFrame::default(), 0, sink);
            assert!(seq.engine().pending_off().is_some());
            Err("terminal gone")
        });

        assert_eq!(result, Err("terminal gone"));
        assert_eq!(sink.ons(), 1);
        assert_eq!(sink.offs(), 1);
        assert_eq!(seq.engine().transport(), Transport::Stopped);
    }
}
