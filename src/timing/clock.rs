// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clock sources for step advance.
//!
//! A step advances either from elapsed wall time (`ClockSource::Internal`)
//! or from counted MIDI clock pulses (`ClockSource::External`). This module
//! also provides the 24 PPQN clock generator used to send clock downstream
//! while internally clocked.
//!
//! All times are integer milliseconds from an arbitrary monotonic origin, so
//! every clock here can be driven from tests with synthetic time.

use std::time::Instant;

use crate::midi::messages;

/// Pulses Per Quarter Note - MIDI standard is 24
pub const PPQN: u32 = 24;

/// Slowest accepted tempo. Zero would divide by zero in the step interval.
pub const MIN_TEMPO: u32 = 1;
/// Fastest accepted tempo
pub const MAX_TEMPO: u32 = 999;

/// Shortest external-clock silence that drops back to the internal clock
const MIN_EXTERNAL_TIMEOUT_MS: u64 = 250;

/// Clamp a requested tempo into the accepted range
pub fn clamp_tempo(bpm: i64) -> u32 {
    bpm.clamp(MIN_TEMPO as i64, MAX_TEMPO as i64) as u32
}

/// Step period in milliseconds: `60000 / (steps_per_beat * tempo)`
pub fn step_interval_ms(tempo_bpm: u32, steps_per_beat: u32) -> u64 {
    let divisor = steps_per_beat.max(1) as u64 * tempo_bpm.max(MIN_TEMPO) as u64;
    60_000 / divisor
}

/// Monotonic millisecond clock
pub trait TimeSource {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from its own creation
#[derive(Debug, Clone, Copy)]
pub struct SystemTime {
    origin: Instant,
}

impl SystemTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTime {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// What a single external clock pulse produced
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseOutcome {
    /// A step boundary was reached
    pub advance: bool,
    /// A quarter note completed; tempo measured from its duration
    pub measured_tempo: Option<u32>,
}

/// Follower for incoming MIDI clock pulses
#[derive(Debug, Clone)]
pub struct ExternalClock {
    /// Pulses counted since the last Start/Stop
    pulse_count: u64,
    /// Pulses per sequencer step (6 for 16th notes)
    pulses_per_step: u32,
    /// When the most recent pulse arrived
    last_pulse: Option<u64>,
    /// When transport last armed the follower (Start/Continue/Stop)
    armed_at: Option<u64>,
    /// When the most recent quarter note completed
    last_quarter: Option<u64>,
    /// Tempo derived from the last full quarter note (display only)
    measured_tempo: Option<u32>,
    /// Step period derived from the last full quarter note
    measured_step_ms: Option<u64>,
}

impl ExternalClock {
    pub fn new(steps_per_beat: u32) -> Self {
        Self {
            pulse_count: 0,
            pulses_per_step: (PPQN / steps_per_beat.max(1)).max(1),
            last_pulse: None,
            armed_at: None,
            last_quarter: None,
            measured_tempo: None,
            measured_step_ms: None,
        }
    }

    /// Count one clock pulse
    pub fn pulse(&mut self, now: u64) -> PulseOutcome {
        self.pulse_count += 1;
        self.last_pulse = Some(now);

        let mut outcome = PulseOutcome {
            advance: self.pulse_count % self.pulses_per_step as u64 == 0,
            measured_tempo: None,
        };

        if self.pulse_count % PPQN as u64 == 0 {
            if let Some(prev) = self.last_quarter {
                let quarter_ms = now.saturating_sub(prev).max(1);
                let tempo = clamp_tempo((60_000 / quarter_ms) as i64);
                let steps_per_quarter = (PPQN / self.pulses_per_step).max(1) as u64;
                self.measured_tempo = Some(tempo);
                self.measured_step_ms = Some((quarter_ms / steps_per_quarter).max(1));
                outcome.measured_tempo = Some(tempo);
            }
            self.last_quarter = Some(now);
        }

        outcome
    }

    /// Start or Stop received: count from zero again
    pub fn reset(&mut self) {
        self.pulse_count = 0;
        self.last_quarter = None;
    }

    /// Transport message received at `now`. Silence is timed from here until
    /// the next pulse arrives.
    pub fn arm(&mut self, now: u64) {
        self.armed_at = Some(now);
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count
    }

    pub fn pulses_per_step(&self) -> u32 {
        self.pulses_per_step
    }

    /// Most recent pulse or transport message, whichever came last
    pub fn last_activity(&self) -> Option<u64> {
        self.last_pulse.max(self.armed_at)
    }

    pub fn measured_tempo(&self) -> Option<u32> {
        self.measured_tempo
    }

    pub fn measured_step_ms(&self) -> Option<u64> {
        self.measured_step_ms
    }
}

/// Where step advances come from
#[derive(Debug, Clone)]
pub enum ClockSource {
    /// Advance from elapsed time at the engine tempo
    Internal,
    /// Advance every N incoming MIDI clock pulses
    External(ExternalClock),
}

impl ClockSource {
    pub fn is_external(&self) -> bool {
        matches!(self, ClockSource::External(_))
    }

    /// Internal clock test: strictly more than one interval has elapsed
    pub fn should_advance(&self, now: u64, last_advance: Option<u64>, interval_ms: u64) -> bool {
        match self {
            ClockSource::Internal => match last_advance {
                None => true,
                Some(last) => now.saturating_sub(last) > interval_ms,
            },
            ClockSource::External(_) => false,
        }
    }

    /// Whether an external clock has gone silent for longer than `timeout_ms`
    pub fn external_expired(&self, now: u64, timeout_ms: u64) -> bool {
        match self {
            ClockSource::External(ext) => match ext.last_activity() {
                Some(last) => now.saturating_sub(last) > timeout_ms.max(MIN_EXTERNAL_TIMEOUT_MS),
                None => false,
            },
            ClockSource::Internal => false,
        }
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        ClockSource::Internal
    }
}

/// MIDI Clock output state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// 24 PPQN MIDI clock generator driven by injected time.
///
/// Pulse `n` after the anchor is due at `anchor + n * pulse_interval`, so
/// late polling never accumulates drift; a late poll reports every pulse
/// that fell due.
#[derive(Debug)]
pub struct ClockOutput {
    bpm: u32,
    state: ClockState,
    /// Time pulse numbering restarted from
    anchor_ms: u64,
    /// Pulses emitted since the anchor
    pulses_since_anchor: u64,
    /// Total pulses since start
    pulse: u64,
}

impl ClockOutput {
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm: clamp_tempo(bpm as i64),
            state: ClockState::Stopped,
            anchor_ms: 0,
            pulses_since_anchor: 0,
            pulse: 0,
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Change tempo, keeping already emitted pulses in place
    pub fn set_bpm(&mut self, bpm: u32, now: u64) {
        let bpm = clamp_tempo(bpm as i64);
        if bpm == self.bpm {
            return;
        }
        self.bpm = bpm;
        self.anchor_ms = now;
        self.pulses_since_anchor = 0;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Total pulses since the last start
    pub fn pulse(&self) -> u64 {
        self.pulse
    }

    pub fn beat(&self) -> u64 {
        self.pulse / PPQN as u64
    }

    /// Interval between clock pulses in milliseconds
    pub fn pulse_interval_ms(&self) -> f64 {
        60_000.0 / (self.bpm as f64 * PPQN as f64)
    }

    /// Start the clock - returns MIDI Start message
    pub fn start(&mut self, now: u64) -> [u8; 1] {
        self.state = ClockState::Running;
        self.pulse = 0;
        self.anchor_ms = now;
        self.pulses_since_anchor = 0;
        [messages::START]
    }

    /// Stop the clock - returns MIDI Stop message
    pub fn stop(&mut self) -> [u8; 1] {
        self.state = ClockState::Stopped;
        self.pulse = 0;
        [messages::STOP]
    }

    /// Pause the clock (continue from current position) - returns MIDI Stop message
    pub fn pause(&mut self) -> [u8; 1] {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
        [messages::STOP]
    }

    /// Continue from paused state - returns MIDI Continue message
    pub fn continue_playback(&mut self, now: u64) -> [u8; 1] {
        if self.state == ClockState::Paused {
            self.state = ClockState::Running;
            self.anchor_ms = now;
            self.pulses_since_anchor = 0;
        }
        [messages::CONTINUE]
    }

    /// Number of Timing Clock messages due at `now`
    pub fn tick(&mut self, now: u64) -> u32 {
        if self.state != ClockState::Running {
            return 0;
        }

        let elapsed = now.saturating_sub(self.anchor_ms);
        // Pulse 0 goes out with the Start message
        let due = elapsed * self.bpm as u64 * PPQN as u64 / 60_000;
        let count = due.saturating_sub(self.pulses_since_anchor);
        self.pulses_since_anchor = due.max(self.pulses_since_anchor);
        self.pulse += count;
        count as u32
    }
}

impl Default for ClockOutput {
    fn default() -> Self {
        Self::new(120)
    }
}
