// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for the encoder and step keys.
//!
//! This module provides:
//! - Raw input edges and the physical-key to step mapping
//! - The gesture interpreter that turns overlapping presses and turns into actions
//! - A terminal keyboard adapter standing in for the hardware

pub mod input;
pub mod interpreter;
pub mod terminal;

pub use input::{EncoderEdge, InputFrame, KeyEdge, KeyMap};
pub use interpreter::{GestureTimings, InputInterpreter};
pub use terminal::TerminalSurface;

/// Action resolved from a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    // Transport
    /// Toggle play/pause
    TogglePlay,

    // Global
    /// Adjust tempo by delta
    AdjustTempo(i32),
    /// Adjust transpose by delta
    AdjustTranspose(i32),

    // Step editing
    /// Adjust a step's note; `preview` re-sounds it at the new pitch
    AdjustNote { step: usize, delta: i32, preview: bool },
    /// Adjust a step's gate
    AdjustGate { step: usize, delta: i32 },
    /// Toggle a step's enabled flag
    ToggleStep(usize),
    /// Show a step as held or released
    SelectStep { step: usize, selected: bool },
    /// Sound a step for audition
    PreviewOn(usize),
    /// End an audition
    PreviewOff(usize),

    // Bank
    /// Load the sequence in a slot
    LoadSlot(usize),
    /// Save the current sequence into a slot
    SaveSlot(usize),
    /// Releasing now would save into this slot
    PendingSave(usize),
}
