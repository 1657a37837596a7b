// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input for an external clock.
//!
//! This module parses incoming MIDI bytes and forwards them from the midir
//! callback thread to the main loop over a channel. Only clock and transport
//! messages drive the sequencer; notes are parsed for logging.

use std::sync::mpsc::{self, Receiver};

use midir::{Ignore, MidiInput as MidirInput, MidiInputConnection};
use tracing::{debug, info};

use super::messages;
use crate::error::{Result, SeqError};

const CLIENT_NAME: &str = "stepseq input";

/// Parsed MIDI message types
#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// MIDI Clock tick
    TimingClock,
    /// Start playback
    Start,
    /// Continue playback
    Continue,
    /// Stop playback
    Stop,
    /// Anything else
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        match status {
            messages::TIMING_CLOCK => return Some(MidiMessage::TimingClock),
            messages::START => return Some(MidiMessage::Start),
            messages::CONTINUE => return Some(MidiMessage::Continue),
            messages::STOP => return Some(MidiMessage::Stop),
            _ => {}
        }

        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            messages::NOTE_OFF if data.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::NOTE_ON if data.len() >= 3 => {
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is equivalent to Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[1] & 0x7F,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data[1] & 0x7F,
                        velocity,
                    })
                }
            }
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }

    /// Check if this is a clock-related message
    pub fn is_clock_message(&self) -> bool {
        matches!(
            self,
            MidiMessage::TimingClock | MidiMessage::Start | MidiMessage::Continue | MidiMessage::Stop
        )
    }
}

/// Connected MIDI input delivering parsed messages to the main loop
pub struct MidiClockInput {
    _connection: MidiInputConnection<()>,
    receiver: Receiver<MidiMessage>,
    port_name: String,
}

impl MidiClockInput {
    /// Connect to the source at `index` (see `list_sources`)
    pub fn new(index: usize) -> Result<Self> {
        let mut midi_in = MidirInput::new(CLIENT_NAME).map_err(SeqError::midi)?;
        // Clock bytes are timing messages, so only sysex and active sense are dropped
        midi_in.ignore(Ignore::SysexAndActiveSense);

        let ports = midi_in.ports();
        let port = ports.get(index).ok_or_else(|| {
            SeqError::Midi(format!(
                "MIDI source {} not found (only {} available)",
                index,
                ports.len()
            ))
        })?;
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", index));

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                port,
                "stepseq-clock-in",
                move |_stamp, data, _| {
                    if let Some(msg) = MidiMessage::parse(data) {
                        // Receiver gone means we are shutting down
                        let _ = tx.send(msg);
                    }
                },
                (),
            )
            .map_err(SeqError::midi)?;

        info!(port = %port_name, "MIDI input connected");
        Ok(Self {
            _connection: connection,
            receiver: rx,
            port_name,
        })
    }

    /// Connect to the first source whose name contains `name` (case-insensitive)
    pub fn new_by_name(name: &str) -> Result<Self> {
        let needle = name.to_lowercase();
        let (index, _) = list_sources()
            .into_iter()
            .find(|(_, n)| n.to_lowercase().contains(&needle))
            .ok_or_else(|| SeqError::Midi(format!("No MIDI source matching '{}' found", name)))?;
        Self::new(index)
    }

    /// Connect by index if `spec` is a number, otherwise by name
    pub fn open(spec: &str) -> Result<Self> {
        match spec.parse::<usize>() {
            Ok(index) => Self::new(index),
            Err(_) => Self::new_by_name(spec),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Try to receive the next MIDI message (non-blocking)
    pub fn try_recv(&self) -> Option<MidiMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending MIDI messages
    pub fn recv_all(&self) -> Vec<MidiMessage> {
        let messages: Vec<MidiMessage> = self.receiver.try_iter().collect();
        if !messages.is_empty() {
            debug!(count = messages.len(), "MIDI input drained");
        }
        messages
    }
}

/// List all available MIDI sources
pub fn list_sources() -> Vec<(usize, String)> {
    let Ok(midi_in) = MidirInput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI sources to stdout
pub fn print_sources() {
    let sources = list_sources();
    if sources.is_empty() {
        println!("No MIDI sources found.");
    } else {
        println!("Available MIDI sources (inputs):");
        for (i, name) in sources {
            println!("  {}: {}", i, name);
        }
    }
}
