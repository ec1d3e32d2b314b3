//! Checkpoint record and burn module serialization.

use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::CheckpointError;
use crate::normalization::{EmpiricalNormalizer, Normalizer};

/// Current on-disk checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Snapshot of a training session.
///
/// Stored as a single JSON object. The two observation normalizer keys are
/// present only when empirical normalization is enabled.
///
/// Parameter blobs are written as JSON arrays of byte values, which takes
/// roughly three to four times the raw blob size on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    #[serde(rename = "model_state_dict")]
    pub model_state: Vec<u8>,
    #[serde(rename = "optimizer_state_dict")]
    pub optimizer_state: Vec<u8>,
    #[serde(rename = "discriminator_state_dict")]
    pub discriminator_state: Vec<u8>,
    pub amp_normalizer: Normalizer,
    /// Learning iterations completed.
    pub iter: usize,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "obs_norm_state_dict")]
    pub obs_normalizer: Option<EmpiricalNormalizer>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "critic_obs_norm_state_dict")]
    pub critic_obs_normalizer: Option<EmpiricalNormalizer>,
    /// Caller-supplied payload.
    #[serde(default)]
    pub infos: Option<serde_json::Value>,
}

impl Checkpoint {
    /// Write the record to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(self).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a record, rejecting unknown format versions.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let bytes = fs::read(path)?;
        let checkpoint: Self =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(checkpoint)
    }
}

/// Serialize a burn module's parameters to bytes.
pub fn module_to_bytes<B: Backend, M: Module<B>>(module: &M) -> Result<Vec<u8>, CheckpointError> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, module.clone().into_record(), ())
        .map_err(|e| CheckpointError::Recorder(e.to_string()))
}

/// Load parameters produced by [`module_to_bytes`] into `template`.
pub fn module_from_bytes<B: Backend, M: Module<B>>(
    template: M,
    bytes: Vec<u8>,
    device: &B::Device,
) -> Result<M, CheckpointError> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = Recorder::<B>::load(&recorder, bytes, device)
        .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
    Ok(template.load_record(record))
}
