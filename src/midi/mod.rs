// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI I/O abstraction layer.
//!
//! This module provides a trait-based abstraction for MIDI output so the
//! note sink can drive a hardware port, a virtual port or a test double
//! interchangeably, plus a parser for the incoming clock and transport
//! messages.

pub mod input;
pub mod output;
pub mod sink;

use crate::error::Result;

pub use input::{list_sources, print_sources, MidiClockInput, MidiMessage};
pub use output::{list_destinations, print_destinations, MidirPort};
pub use sink::MidiNoteSink;

/// Trait for MIDI output implementations.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Note On on `channel` (0-15)
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.send(&[messages::NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
    }

    /// Note Off on `channel` (0-15)
    fn note_off(&mut self, channel: u8, note: u8) -> Result<()> {
        self.send(&[messages::NOTE_OFF | (channel & 0x0F), note & 0x7F, 0])
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;

    /// True for single-byte System Real-Time status bytes
    pub fn is_realtime(status: u8) -> bool {
        status >= 0xF8
    }
}
