// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Display notifications.
//!
//! The core never draws anything. It queues `DisplayEvent`s describing what
//! changed, and whatever front-end is attached decides how to show them.

use crate::sequencer::{Engine, Step, Transport};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Something the display should refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A step's contents or selection changed
    StepChanged { index: usize, step: Step, selected: bool },
    /// The playhead moved to `index`
    PlayheadMoved(usize),
    TempoChanged(u32),
    TransposeChanged(i32),
    PlayingChanged(bool),
    /// A sequence was loaded from `slot`
    SlotChanged(usize),
    /// The current sequence was saved into `slot`
    Saved(usize),
    /// Releasing now would save into `slot`
    PendingSave(usize),
    /// Redraw everything
    All,
}

/// Note name and octave, with middle C (60) as C4
pub fn note_octave(note: u8) -> (&'static str, i32) {
    let name = NOTE_NAMES[(note % 12) as usize];
    let octave = note as i32 / 12 - 1;
    (name, octave)
}

/// Note name with octave, e.g. "C4", "F#2"
pub fn note_name(note: u8) -> String {
    let (name, octave) = note_octave(note);
    format!("{}{}", name, octave)
}

/// Gate as a bar of `width` cells
pub fn gate_bar(gate: u8, width: usize) -> String {
    let filled = (gate as usize * width).div_ceil(16).min(width);
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

/// One-line summary of the transport and every step.
///
/// Muted steps are shown in lowercase brackets, the playhead with `>`.
pub fn status_line(engine: &Engine, banner: Option<&str>) -> String {
    let play = match engine.transport() {
        Transport::Playing => " >",
        Transport::Paused => "||",
        Transport::Stopped => "[]",
    };
    let clock = if engine.clock_source().is_external() { "ext" } else { "int" };

    let steps: Vec<String> = engine
        .sequence()
        .steps()
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let head = if i == engine.current_index() && engine.transport() != Transport::Stopped {
                '>'
            } else {
                ' '
            };
            let name = note_name(step.note);
            if step.enabled {
                format!("{}{:<4}{}", head, name, gate_bar(step.gate, 4))
            } else {
                format!("{}({:<3}){}", head, name.to_lowercase(), gate_bar(step.gate, 4))
            }
        })
        .collect();

    let seq_label = match banner {
        Some(text) => text.to_string(),
        None => format!("seq:{}", engine.slot() + 1),
    };

    format!(
        "{} {} bpm:{:<3} trs:{:+3} {} | {}",
        play,
        clock,
        engine.display_tempo(),
        engine.transpose(),
        seq_label,
        steps.join(" ")
    )
}
