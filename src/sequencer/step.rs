// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Steps and fixed-length sequences.

use serde::{Deserialize, Serialize};

/// Lowest note reachable by editing or transposing
pub const NOTE_MIN: u8 = 1;
/// Highest MIDI note
pub const NOTE_MAX: u8 = 127;
/// Highest MIDI velocity
pub const VELOCITY_MAX: u8 = 127;
/// Shortest gate (1/16 of a step)
pub const GATE_MIN: u8 = 1;
/// Full-step gate
pub const GATE_MAX: u8 = 16;
/// Transpose range in semitones
pub const TRANSPOSE_MIN: i32 = -36;
pub const TRANSPOSE_MAX: i32 = 36;

/// Default number of steps in a sequence
pub const DEFAULT_STEP_COUNT: usize = 8;

/// Clamp an arbitrary integer into the playable note range
pub fn clamp_note(note: i32) -> u8 {
    note.clamp(NOTE_MIN as i32, NOTE_MAX as i32) as u8
}

/// Clamp an arbitrary integer into the gate range
pub fn clamp_gate(gate: i32) -> u8 {
    gate.clamp(GATE_MIN as i32, GATE_MAX as i32) as u8
}

/// Clamp an arbitrary integer into the transpose range
pub fn clamp_transpose(semitones: i32) -> i32 {
    semitones.clamp(TRANSPOSE_MIN, TRANSPOSE_MAX)
}

/// One slot of a sequence.
///
/// Steps are plain values: edits build a new `Step` and store it over the
/// old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// MIDI note (0-127)
    pub note: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// Gate length in sixteenths of a step (1-16)
    pub gate: u8,
    /// Whether the step sounds
    pub enabled: bool,
}

impl Step {
    /// Create a step, clamping every field into range
    pub fn new(note: u8, velocity: u8, gate: u8, enabled: bool) -> Self {
        Self {
            note: note.min(NOTE_MAX),
            velocity: velocity.min(VELOCITY_MAX),
            gate: gate.clamp(GATE_MIN, GATE_MAX),
            enabled,
        }
    }

    pub fn with_note(self, note: i32) -> Self {
        Self {
            note: clamp_note(note),
            ..self
        }
    }

    pub fn with_gate(self, gate: i32) -> Self {
        Self {
            gate: clamp_gate(gate),
            ..self
        }
    }

    pub fn with_velocity(self, velocity: u8) -> Self {
        Self {
            velocity: velocity.min(VELOCITY_MAX),
            ..self
        }
    }

    pub fn toggled(self) -> Self {
        Self {
            enabled: !self.enabled,
            ..self
        }
    }

    /// The step as it will be dispatched under `transpose`
    pub fn transposed(self, transpose: i32) -> Self {
        self.with_note(self.note as i32 + transpose)
    }

    /// Force every field back into range (used after deserializing)
    pub fn sanitized(self) -> Self {
        Self::new(self.note, self.velocity, self.gate, self.enabled)
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::new(60, 127, 8, true)
    }
}

/// Ordered, fixed-length collection of steps.
///
/// The length is set at construction; `set` outside of it is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    /// Create a sequence of `len` copies of `step`
    pub fn filled(len: usize, step: Step) -> Self {
        Self {
            steps: vec![step; len.max(1)],
        }
    }

    /// Build from explicit steps
    pub fn from_steps(steps: Vec<Step>) -> Self {
        if steps.is_empty() {
            return Self::default();
        }
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Step> {
        self.steps.get(index).copied()
    }

    /// Replace the step at `index`. Returns false if out of range.
    pub fn set(&mut self, index: usize, step: Step) -> bool {
        match self.steps.get_mut(index) {
            Some(slot) => {
                *slot = step;
                true
            }
            None => false,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Resize to `len`, padding with `fill`, and clamp every step
    pub fn normalized(mut self, len: usize, fill: Step) -> Self {
        self.steps.resize(len.max(1), fill);
        for step in &mut self.steps {
            *step = step.sanitized();
        }
        self
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::filled(DEFAULT_STEP_COUNT, Step::default())
    }
}
