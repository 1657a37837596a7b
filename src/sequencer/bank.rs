// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequence bank.
//!
//! Eight independently stored sequences. Every slot owns its own storage and
//! the engine only ever receives a copy, so saving into one slot can never
//! change another slot or the live sequence.

use tracing::{debug, warn};

use super::step::{Sequence, Step};

/// Number of slots in a bank
pub const DEFAULT_SLOT_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBank {
    slots: Vec<Sequence>,
    active_slot: usize,
}

impl SequenceBank {
    /// A bank of `slot_count` sequences, each `step_count` copies of `step`
    pub fn new(slot_count: usize, step_count: usize, step: Step) -> Self {
        let slots = (0..slot_count.max(1))
            .map(|_| Sequence::filled(step_count, step))
            .collect();
        Self {
            slots,
            active_slot: 0,
        }
    }

    /// Build from stored sequences, padding or truncating to `slot_count`
    /// and forcing every sequence to `step_count` steps.
    pub fn from_sequences(
        sequences: Vec<Sequence>,
        slot_count: usize,
        step_count: usize,
        fill: Step,
    ) -> Self {
        if sequences.len() != slot_count {
            warn!(
                found = sequences.len(),
                expected = slot_count,
                "saved bank has wrong slot count, adjusting"
            );
        }
        let mut bank = Self::new(slot_count, step_count, fill);
        for (slot, sequence) in bank.slots.iter_mut().zip(sequences) {
            *slot = sequence.normalized(step_count, fill);
        }
        bank
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    /// Copy of the sequence in `slot`; marks it active
    pub fn load(&mut self, slot: usize) -> Option<Sequence> {
        let sequence = self.slots.get(slot)?.clone();
        self.active_slot = slot;
        debug!(slot, "bank load");
        Some(sequence)
    }

    /// Store a copy of `sequence` into `slot`. Returns false if out of range.
    pub fn save(&mut self, slot: usize, sequence: &Sequence) -> bool {
        match self.slots.get_mut(slot) {
            Some(stored) => {
                *stored = sequence.clone();
                debug!(slot, "bank save");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Sequence> {
        self.slots.get(slot)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.slots
    }
}

impl Default for SequenceBank {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_COUNT, 8, Step::default())
    }
}
