// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the sequencer.
//!
//! Everything is optional: a missing file or a missing key means the
//! default. Out-of-range values are clamped by `validate`, never rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::control::{GestureTimings, KeyMap};
use crate::error::{Result, SeqError};
use crate::sequencer::step::{clamp_gate, clamp_note, DEFAULT_STEP_COUNT};
use crate::sequencer::{EngineConfig, Step, DEFAULT_SLOT_COUNT};
use crate::storage::DEFAULT_COOLDOWN_MS;
use crate::timing::{clamp_tempo, PPQN};

/// Largest sequence or bank accepted from a config file
const MAX_STEPS: usize = 64;
const MAX_SLOTS: usize = 64;

/// Runtime configuration, read from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Steps per sequence
    pub step_count: usize,
    /// Sequences in the bank
    pub slot_count: usize,
    /// Steps per quarter note (4 = 16th notes)
    pub steps_per_beat: u32,
    /// Initial tempo in BPM
    pub tempo: u32,
    /// Note of every step in a fresh sequence
    pub base_note: u8,
    /// Gate of every step in a fresh sequence (1-16)
    pub gate: u8,
    /// Velocity of every step in a fresh sequence
    pub velocity: u8,
    /// Play every step at this velocity instead of its own
    pub velocity_override: Option<u8>,
    /// MIDI channel (1-16)
    pub midi_channel: u8,
    /// Send 24 PPQN clock and Start/Stop on the outputs
    pub send_clock: bool,
    /// Silence before an external clock is abandoned; unset = one quarter note
    pub external_timeout_ms: Option<u64>,
    /// Encoder releases shorter than this toggle play
    pub tap_ms: u64,
    /// Key holds longer than this save instead of load
    pub hold_ms: u64,
    /// Minimum time between writes of the saved sequences
    pub write_cooldown_ms: u64,
    /// Saved sequences file
    pub sequences_path: PathBuf,
    /// Physical key for each step
    pub key_map: KeyMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_count: DEFAULT_STEP_COUNT,
            slot_count: DEFAULT_SLOT_COUNT,
            steps_per_beat: 4,
            tempo: 100,
            base_note: 60,
            gate: 8,
            velocity: 127,
            velocity_override: None,
            midi_channel: 1,
            send_clock: false,
            external_timeout_ms: None,
            tap_ms: 300,
            hold_ms: 1000,
            write_cooldown_ms: DEFAULT_COOLDOWN_MS,
            sequences_path: PathBuf::from("saved_sequences.yaml"),
            key_map: KeyMap::identity(DEFAULT_STEP_COUNT),
        }
    }
}

impl Config {
    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents =
            fs::read_to_string(path.as_ref()).map_err(|e| SeqError::io(path.as_ref(), e))?;
        let mut config = Self::from_toml(&contents)?;
        config.validate();
        Ok(config)
    }

    /// Parse without validating
    pub fn from_toml(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Clamp out-of-range values in place. Returns the number of fields changed.
    pub fn validate(&mut self) -> usize {
        let mut fixed = 0;
        let mut note = |field: &str, from: String, to: String| {
            warn!(field, from = %from, to = %to, "config value out of range, clamped");
            fixed += 1;
        };

        let step_count = self.step_count.clamp(1, MAX_STEPS);
        if step_count != self.step_count {
            note("step_count", self.step_count.to_string(), step_count.to_string());
            self.step_count = step_count;
        }

        let slot_count = self.slot_count.clamp(1, MAX_SLOTS);
        if slot_count != self.slot_count {
            note("slot_count", self.slot_count.to_string(), slot_count.to_string());
            self.slot_count = slot_count;
        }

        let spb = self.steps_per_beat.clamp(1, PPQN);
        if spb != self.steps_per_beat {
            note("steps_per_beat", self.steps_per_beat.to_string(), spb.to_string());
            self.steps_per_beat = spb;
        }

        let tempo = clamp_tempo(self.tempo as i64);
        if tempo != self.tempo {
            note("tempo", self.tempo.to_string(), tempo.to_string());
            self.tempo = tempo;
        }

        let base_note = clamp_note(self.base_note as i32);
        if base_note != self.base_note {
            note("base_note", self.base_note.to_string(), base_note.to_string());
            self.base_note = base_note;
        }

        let gate = clamp_gate(self.gate as i32);
        if gate != self.gate {
            note("gate", self.gate.to_string(), gate.to_string());
            self.gate = gate;
        }

        if self.velocity > 127 {
            note("velocity", self.velocity.to_string(), "127".into());
            self.velocity = 127;
        }

        if let Some(v) = self.velocity_override.filter(|v| *v > 127) {
            note("velocity_override", v.to_string(), "127".into());
            self.velocity_override = Some(127);
        }

        let channel = self.midi_channel.clamp(1, 16);
        if channel != self.midi_channel {
            note("midi_channel", self.midi_channel.to_string(), channel.to_string());
            self.midi_channel = channel;
        }

        fixed
    }

    /// Step every fresh sequence is filled with
    pub fn default_step(&self) -> Step {
        Step::new(self.base_note, self.velocity, self.gate, true)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            step_count: self.step_count,
            steps_per_beat: self.steps_per_beat,
            tempo: self.tempo,
            velocity_override: self.velocity_override,
            external_timeout_ms: self.external_timeout_ms,
        }
    }

    pub fn gesture_timings(&self) -> GestureTimings {
        GestureTimings {
            tap_ms: self.tap_ms,
            hold_ms: self.hold_ms,
        }
    }
}
