// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Saved-sequence persistence.
//!
//! This module provides:
//! - The `SequenceStore` trait for reading and writing a whole bank
//! - A YAML file store and an in-memory store
//! - A write cooldown that protects flash-like storage from wear

pub mod throttle;
pub mod yaml;

pub use throttle::{WriteThrottle, DEFAULT_COOLDOWN_MS};
pub use yaml::YamlStore;

use tracing::warn;

use crate::error::Result;
use crate::sequencer::{Sequence, SequenceBank, Step};

/// Storage for every sequence in a bank
pub trait SequenceStore {
    fn read_all(&mut self) -> Result<Vec<Sequence>>;
    fn write_all(&mut self, sequences: &[Sequence]) -> Result<()>;
}

/// Store that keeps the last written bank in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub sequences: Option<Vec<Sequence>>,
    pub writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceStore for MemoryStore {
    fn read_all(&mut self) -> Result<Vec<Sequence>> {
        Ok(self.sequences.clone().unwrap_or_default())
    }

    fn write_all(&mut self, sequences: &[Sequence]) -> Result<()> {
        self.sequences = Some(sequences.to_vec());
        self.writes += 1;
        Ok(())
    }
}

/// Read a bank from `store`, falling back to a default bank on any failure
pub fn load_bank_or_default(
    store: &mut dyn SequenceStore,
    slot_count: usize,
    step_count: usize,
    fill: Step,
) -> SequenceBank {
    match store.read_all() {
        Ok(sequences) if !sequences.is_empty() => {
            SequenceBank::from_sequences(sequences, slot_count, step_count, fill)
        }
        Ok(_) => {
            warn!("no saved sequences, using defaults");
            SequenceBank::new(slot_count, step_count, fill)
        }
        Err(e) => {
            warn!(error = %e, "failed to read saved sequences, using defaults");
            SequenceBank::new(slot_count, step_count, fill)
        }
    }
}
