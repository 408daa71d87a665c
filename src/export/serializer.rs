//! Artifact envelope: magic, version, metadata, bincode payload and checksum

use crate::data::Schema;
use crate::error::{KolosalError, Result};
use crate::pipeline::TrainedModel;
use crate::training::TrainerKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Descriptive header stored alongside the model payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Version of the crate that wrote the artifact
    pub writer_version: String,
    pub trainer: TrainerKind,
    pub num_features: usize,
    pub num_trees: usize,
    pub num_steps: usize,
    pub label_column: String,
    pub feature_column: String,
    pub schema: Schema,
}

impl ArtifactMetadata {
    pub fn describe(model: &TrainedModel) -> Self {
        Self {
            writer_version: env!("CARGO_PKG_VERSION").to_string(),
            trainer: model.trainer_kind(),
            num_features: model.num_features(),
            num_trees: model.predictor().ensemble().num_trees(),
            num_steps: model.num_steps(),
            label_column: model.label_column().to_string(),
            feature_column: model.feature_column().to_string(),
            schema: model.schema().clone(),
        }
    }
}

/// On-disk envelope. bincode writes the fixed-size magic and version first,
/// so both can be checked before the rest is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SerializedModel {
    magic: [u8; 4],
    format_version: u32,
    metadata: ArtifactMetadata,
    model_data: Vec<u8>,
    checksum: u64,
}

impl SerializedModel {
    pub(crate) const MAGIC: [u8; 4] = *b"KPLM";
    pub(crate) const VERSION: u32 = 1;

    pub(crate) fn from_model(model: &TrainedModel) -> Result<Self> {
        let model_data = bincode::serialize(model).map_err(|e| {
            KolosalError::SerializationError(format!("failed to encode model: {}", e))
        })?;
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata: ArtifactMetadata::describe(model),
            checksum: compute_checksum(&model_data),
            model_data,
        })
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            KolosalError::SerializationError(format!("failed to encode artifact: {}", e))
        })
    }

    /// Decode and verify the envelope; the model payload is left encoded
    pub(crate) fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self> {
        if bytes.len() < 4 || bytes[..4] != Self::MAGIC {
            return Err(KolosalError::artifact(path, "not a model artifact (bad magic)"));
        }
        if bytes.len() < 8 {
            return Err(KolosalError::artifact(path, "artifact is truncated"));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != Self::VERSION {
            return Err(KolosalError::artifact(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    version,
                    Self::VERSION
                ),
            ));
        }

        let envelope: Self = bincode::deserialize(bytes)
            .map_err(|e| KolosalError::artifact(path, format!("artifact is truncated or corrupt: {}", e)))?;
        if compute_checksum(&envelope.model_data) != envelope.checksum {
            return Err(KolosalError::artifact(path, "checksum mismatch"));
        }
        Ok(envelope)
    }

    pub(crate) fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub(crate) fn decode_model(&self, path: &Path) -> Result<TrainedModel> {
        let model: TrainedModel = bincode::deserialize(&self.model_data)
            .map_err(|e| KolosalError::artifact(path, format!("payload does not decode: {}", e)))?;
        model
            .validate()
            .map_err(|e| KolosalError::artifact(path, format!("payload is inconsistent: {}", e)))?;
        Ok(model.into_loaded())
    }
}

/// FNV-1a over the payload bytes
pub(crate) fn compute_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
