// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! YAML file store for saved sequences.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::SequenceStore;
use crate::error::{Result, SeqError};
use crate::sequencer::Sequence;

/// Saved sequences as a YAML list of step lists
#[derive(Debug, Clone)]
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse sequences from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Vec<Sequence>> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize sequences to a YAML string
    pub fn to_yaml(sequences: &[Sequence]) -> Result<String> {
        Ok(serde_yaml::to_string(sequences)?)
    }
}

impl SequenceStore for YamlStore {
    fn read_all(&mut self) -> Result<Vec<Sequence>> {
        let contents =
            fs::read_to_string(&self.path).map_err(|e| SeqError::io(&self.path, e))?;
        let sequences = Self::from_yaml(&contents)?;
        info!(path = ?self.path, count = sequences.len(), "read saved sequences");
        Ok(sequences)
    }

    fn write_all(&mut self, sequences: &[Sequence]) -> Result<()> {
        let yaml = Self::to_yaml(sequences)?;
        // Write beside the target and rename, so a failed write leaves the old bank intact
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(|e| SeqError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| SeqError::io(&self.path, e))?;
        info!(path = ?self.path, count = sequences.len(), "wrote saved sequences");
        Ok(())
    }
}
