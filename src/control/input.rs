// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Raw input sampled once per loop iteration.

use serde::{Deserialize, Serialize};

/// Encoder push-button edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderEdge {
    Pressed,
    Released,
}

/// Step key edge, carrying the physical key number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Pressed(usize),
    Released(usize),
}

impl KeyEdge {
    pub fn key(&self) -> usize {
        match self {
            KeyEdge::Pressed(key) | KeyEdge::Released(key) => *key,
        }
    }
}

/// Everything sampled from the control surface in one iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFrame {
    /// Encoder detents turned since the last frame
    pub encoder_delta: i32,
    pub encoder: Option<EncoderEdge>,
    pub key: Option<KeyEdge>,
}

impl InputFrame {
    pub fn turn(delta: i32) -> Self {
        Self {
            encoder_delta: delta,
            ..Default::default()
        }
    }

    pub fn encoder(edge: EncoderEdge) -> Self {
        Self {
            encoder: Some(edge),
            ..Default::default()
        }
    }

    pub fn key(edge: KeyEdge) -> Self {
        Self {
            key: Some(edge),
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.encoder_delta == 0 && self.encoder.is_none() && self.key.is_none()
    }
}

/// Maps physical key numbers to step indexes.
///
/// `keys[step]` is the physical key for that step. Keys that appear nowhere
/// in the list (function keys, unused pads) have no step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    keys: Vec<usize>,
}

impl KeyMap {
    pub fn new(keys: Vec<usize>) -> Self {
        Self { keys }
    }

    /// Key `n` drives step `n`
    pub fn identity(steps: usize) -> Self {
        Self::new((0..steps).collect())
    }

    /// Step driven by `key`, if any
    pub fn step_for(&self, key: usize) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::identity(8)
    }
}
