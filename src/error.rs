// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the sequencer library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the library layer.
///
/// Nothing in the timing or input core returns these: edits clamp and
/// unmapped input is ignored. Only the I/O edges (MIDI ports, config and
/// saved-sequence files) can fail.
#[derive(Debug, Error)]
pub enum SeqError {
    /// Reading or writing a file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Saved sequences could not be decoded
    #[error("failed to parse saved sequences: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration file could not be decoded
    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    /// A MIDI port could not be opened or written
    #[error("MIDI error: {0}")]
    Midi(String),
}

impl SeqError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SeqError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn midi(err: impl std::fmt::Display) -> Self {
        SeqError::Midi(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SeqError>;
