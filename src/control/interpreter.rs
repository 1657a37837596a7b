// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Gesture interpreter for one encoder and N step keys.
//!
//! The same few controls carry many operations, so a gesture is resolved
//! from what else is held and for how long:
//!
//! | Gesture                                   | Action              |
//! |-------------------------------------------|---------------------|
//! | turn                                      | transpose           |
//! | push + turn                               | tempo               |
//! | hold key + turn                           | step note           |
//! | hold key + push + turn                    | step gate           |
//! | tap encoder (< 300ms)                     | play / pause        |
//! | tap key (playing)                         | mute / unmute step  |
//! | press key (paused)                        | audition step       |
//! | push encoder + tap key (<= 1000ms)        | load sequence       |
//! | push encoder + hold key (> 1000ms)        | save sequence       |
//!
//! Key releases are judged against the encoder state at the time of the
//! release, not the press.

use tracing::debug;

use super::input::{EncoderEdge, InputFrame, KeyEdge, KeyMap};
use super::ControlAction;

/// Gesture time thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTimings {
    /// Encoder releases shorter than this are taps
    pub tap_ms: u64,
    /// Key holds longer than this (with the encoder pushed) save
    pub hold_ms: u64,
}

impl Default for GestureTimings {
    fn default() -> Self {
        Self {
            tap_ms: 300,
            hold_ms: 1000,
        }
    }
}

/// Transient gesture state
#[derive(Debug, Clone)]
pub struct InputInterpreter {
    timings: GestureTimings,
    key_map: KeyMap,
    /// When the encoder was pushed, while it is down
    encoder_push_time: Option<u64>,
    /// The encoder was turned during the current push
    turned_while_pushed: bool,
    /// Step whose key is held (last key wins)
    held_step: Option<usize>,
    key_press_time: Option<u64>,
    /// The held step was edited, so its release does not mute it
    step_edited: bool,
    /// The pending-save hint was already shown for this hold
    save_hinted: bool,
}

impl InputInterpreter {
    pub fn new(key_map: KeyMap, timings: GestureTimings) -> Self {
        Self {
            timings,
            key_map,
            encoder_push_time: None,
            turned_while_pushed: false,
            held_step: None,
            key_press_time: None,
            step_edited: false,
            save_hinted: false,
        }
    }

    pub fn timings(&self) -> GestureTimings {
        self.timings
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    pub fn encoder_pushed(&self) -> bool {
        self.encoder_push_time.is_some()
    }

    pub fn held_step(&self) -> Option<usize> {
        self.held_step
    }

    pub fn step_edited(&self) -> bool {
        self.step_edited
    }

    /// Slot that releasing now would save into, if the gesture has become a save
    pub fn pending_save(&self, now: u64) -> Option<usize> {
        match (self.encoder_push_time, self.held_step, self.key_press_time) {
            (Some(pushed), Some(step), Some(pressed))
                if pushed <= pressed && now.saturating_sub(pressed) > self.timings.hold_ms =>
            {
                Some(step)
            }
            _ => None,
        }
    }

    /// Interpret one frame of input at time `now`.
    ///
    /// `playing` is the transport state the gestures are judged against.
    pub fn process(&mut self, frame: InputFrame, now: u64, playing: bool) -> Vec<ControlAction> {
        let mut actions = Vec::new();

        if !self.save_hinted {
            if let Some(slot) = self.pending_save(now) {
                self.save_hinted = true;
                actions.push(ControlAction::PendingSave(slot));
            }
        }

        if frame.encoder_delta != 0 {
            actions.push(self.turn(frame.encoder_delta, playing));
        }

        match frame.encoder {
            Some(EncoderEdge::Pressed) => {
                self.encoder_push_time = Some(now);
                self.turned_while_pushed = false;
            }
            Some(EncoderEdge::Released) => {
                if let Some(action) = self.encoder_released(now) {
                    actions.push(action);
                }
            }
            None => {}
        }

        match frame.key {
            Some(KeyEdge::Pressed(key)) => self.key_pressed(key, now, playing, &mut actions),
            Some(KeyEdge::Released(key)) => self.key_released(key, now, playing, &mut actions),
            None => {}
        }

        if !actions.is_empty() {
            debug!(?actions, "gesture");
        }
        actions
    }

    fn turn(&mut self, delta: i32, playing: bool) -> ControlAction {
        let pushed = self.encoder_pushed();
        if pushed {
            self.turned_while_pushed = true;
        }

        match self.held_step {
            Some(step) if pushed => {
                self.step_edited = true;
                ControlAction::AdjustGate { step, delta }
            }
            Some(step) => {
                self.step_edited = true;
                ControlAction::AdjustNote {
                    step,
                    delta,
                    preview: !playing,
                }
            }
            None if pushed => ControlAction::AdjustTempo(delta),
            None => ControlAction::AdjustTranspose(delta),
        }
    }

    fn encoder_released(&mut self, now: u64) -> Option<ControlAction> {
        let pushed = self.encoder_push_time.take()?;
        let turned = std::mem::replace(&mut self.turned_while_pushed, false);

        // Longer holds with no key are reserved for stop/rewind, which stays disabled
        if self.held_step.is_none() && !turned && now.saturating_sub(pushed) < self.timings.tap_ms {
            Some(ControlAction::TogglePlay)
        } else {
            None
        }
    }

    fn key_pressed(&mut self, key: usize, now: u64, playing: bool, actions: &mut Vec<ControlAction>) {
        let Some(step) = self.key_map.step_for(key) else {
            return;
        };

        self.held_step = Some(step);
        self.key_press_time = Some(now);
        self.step_edited = false;
        self.save_hinted = false;

        // With the encoder down the key selects a slot, not a step
        if !self.encoder_pushed() {
            actions.push(ControlAction::SelectStep {
                step,
                selected: true,
            });
            if !playing {
                actions.push(ControlAction::PreviewOn(step));
            }
        }
    }

    fn key_released(&mut self, key: usize, now: u64, playing: bool, actions: &mut Vec<ControlAction>) {
        let Some(step) = self.key_map.step_for(key) else {
            return;
        };

        if self.held_step != Some(step) {
            // A key replaced by a later press: only end its audition
            if !playing && !self.encoder_pushed() {
                actions.push(ControlAction::PreviewOff(step));
            }
            actions.push(ControlAction::SelectStep {
                step,
                selected: false,
            });
            return;
        }

        let held_for = now.saturating_sub(self.key_press_time.unwrap_or(now));

        if self.encoder_pushed() {
            if held_for <= self.timings.hold_ms {
                actions.push(ControlAction::LoadSlot(step));
            } else {
                actions.push(ControlAction::SaveSlot(step));
            }
        } else if playing {
            if !self.step_edited {
                actions.push(ControlAction::ToggleStep(step));
            }
        } else {
            actions.push(ControlAction::PreviewOff(step));
        }

        actions.push(ControlAction::SelectStep {
            step,
            selected: false,
        });

        self.held_step = None;
        self.key_press_time = None;
        self.step_edited = false;
        self.save_hinted = false;
    }
}

impl Default for InputInterpreter {
    fn default() -> Self {
        Self::new(KeyMap::default(), GestureTimings::default())
    }
}
