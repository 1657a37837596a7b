// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the internal/external step clocks, MIDI clock
//! generation and the injectable millisecond time source.

pub mod clock;

pub use clock::{
    clamp_tempo, step_interval_ms, ClockOutput, ClockSource, ClockState, ExternalClock,
    PulseOutcome, SystemTime, TimeSource, MAX_TEMPO, MIN_TEMPO, PPQN,
};
