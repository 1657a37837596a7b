// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note sink writing to a MIDI output.

use tracing::{trace, warn};

use super::{messages, MidiOutput};
use crate::sequencer::{NoteSink, Step};

/// Sends dispatched steps as MIDI notes on one channel.
///
/// Muted steps produce no Note On, but every Note Off is sent regardless, so
/// a step muted while sounding is still released.
pub struct MidiNoteSink<O: MidiOutput> {
    output: O,
    /// Channel 0-15
    channel: u8,
    send_errors: u64,
}

impl<O: MidiOutput> MidiNoteSink<O> {
    /// `channel` is 1-16 as shown to users
    pub fn new(output: O, channel: u8) -> Self {
        Self {
            output,
            channel: channel.clamp(1, 16) - 1,
            send_errors: 0,
        }
    }

    /// Channel as shown to users (1-16)
    pub fn channel(&self) -> u8 {
        self.channel + 1
    }

    pub fn send_errors(&self) -> u64 {
        self.send_errors
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    fn report(&mut self, result: crate::error::Result<()>) {
        if let Err(e) = result {
            // Log the first failure and then every hundredth, not every note
            if self.send_errors % 100 == 0 {
                warn!(error = %e, failures = self.send_errors + 1, "MIDI send failed");
            }
            self.send_errors += 1;
        }
    }
}

impl<O: MidiOutput> NoteSink for MidiNoteSink<O> {
    fn note_on(&mut self, step: Step) {
        if !step.enabled {
            return;
        }
        trace!(note = step.note, velocity = step.velocity, "note on");
        let result = self.output.note_on(self.channel, step.note, step.velocity);
        self.report(result);
    }

    fn note_off(&mut self, step: Step) {
        trace!(note = step.note, "note off");
        let result = self.output.note_off(self.channel, step.note);
        self.report(result);
    }

    fn realtime(&mut self, status: u8) {
        if !messages::is_realtime(status) {
            return;
        }
        let result = self.output.send(&[status]);
        self.report(result);
    }
}
