// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! stepseq - an eight-step MIDI step sequencer core.
//!
//! The crate is organised leaf-first:
//! - `sequencer`: steps, sequences, the note sink seam, the scheduling engine and the bank
//! - `timing`: internal/external clock sources and MIDI clock output
//! - `control`: raw encoder/key input and the gesture interpreter
//! - `storage`: saved-sequence persistence with a write cooldown
//! - `app`: the context object that runs one loop iteration at a time

pub mod app;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod storage;
pub mod timing;

pub use app::Sequencer;
pub use config::Config;
pub use error::{Result, SeqError};
