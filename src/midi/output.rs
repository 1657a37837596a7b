// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir output backend.
//!
//! Works with ALSA on Linux, Core MIDI on macOS and WinMM on Windows.

use midir::{MidiOutput as MidirOutput, MidiOutputConnection};
use tracing::info;

use super::MidiOutput;
use crate::error::{Result, SeqError};

const CLIENT_NAME: &str = "stepseq";

/// An open MIDI output port
pub struct MidirPort {
    connection: MidiOutputConnection,
    name: String,
}

impl MidirPort {
    /// Connect to the destination at `index` (see `list_destinations`)
    pub fn new(index: usize) -> Result<Self> {
        let midi_out = MidirOutput::new(CLIENT_NAME).map_err(SeqError::midi)?;

        let ports = midi_out.ports();
        let port = ports.get(index).ok_or_else(|| {
            SeqError::Midi(format!(
                "MIDI destination {} not found (only {} available)",
                index,
                ports.len()
            ))
        })?;
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", index));

        let connection = midi_out
            .connect(port, "stepseq-out")
            .map_err(SeqError::midi)?;

        info!(port = %name, "MIDI output connected");
        Ok(Self { connection, name })
    }

    /// Connect to the first destination whose name contains `name` (case-insensitive)
    pub fn new_by_name(name: &str) -> Result<Self> {
        let needle = name.to_lowercase();
        let (index, _) = list_destinations()
            .into_iter()
            .find(|(_, n)| n.to_lowercase().contains(&needle))
            .ok_or_else(|| SeqError::Midi(format!("No MIDI destination matching '{}' found", name)))?;
        Self::new(index)
    }

    /// Connect by index if `spec` is a number, otherwise by name
    pub fn open(spec: &str) -> Result<Self> {
        match spec.parse::<usize>() {
            Ok(index) => Self::new(index),
            Err(_) => Self::new_by_name(spec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiOutput for MidirPort {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection.send(message).map_err(SeqError::midi)
    }
}

/// List all available MIDI destinations.
///
/// # Returns
/// A vector of (index, name) tuples.
pub fn list_destinations() -> Vec<(usize, String)> {
    let Ok(midi_out) = MidirOutput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI destinations to stdout.
pub fn print_destinations() {
    let destinations = list_destinations();
    if destinations.is_empty() {
        println!("No MIDI destinations found.");
    } else {
        println!("Available MIDI destinations:");
        for (i, name) in destinations {
            println!("  {}: {}", i, name);
        }
    }
}
