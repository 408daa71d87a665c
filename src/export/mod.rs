//! Model persistence
//!
//! One self-describing binary artifact per model. The artifact embeds the
//! schema and text layout, so loading needs nothing but a path.

mod serializer;

pub use serializer::ArtifactMetadata;

use crate::error::{KolosalError, Result};
use crate::pipeline::TrainedModel;
use serializer::SerializedModel;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Write `model` to `path`. The file is written next to its destination and renamed
/// into place, so readers see either the old artifact or the complete new one.
pub fn save(model: &TrainedModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = SerializedModel::from_model(model)?.to_bytes()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |e: std::io::Error| KolosalError::artifact(path, e.to_string());

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    info!(path = %path.display(), bytes = bytes.len(), "saved model artifact");
    Ok(())
}

fn read_envelope(path: &Path) -> Result<SerializedModel> {
    let bytes = std::fs::read(path).map_err(|e| KolosalError::artifact(path, e.to_string()))?;
    SerializedModel::from_bytes(&bytes, path)
}

/// Read an artifact back into a model tagged [`crate::pipeline::ModelState::Loaded`]
pub fn load(path: impl AsRef<Path>) -> Result<TrainedModel> {
    let path = path.as_ref();
    let envelope = read_envelope(path)?;
    let model = envelope.decode_model(path)?;
    info!(
        path = %path.display(),
        trainer = ?envelope.metadata().trainer,
        features = envelope.metadata().num_features,
        "loaded model artifact"
    );
    Ok(model)
}

/// Read only the artifact header
pub fn inspect(path: impl AsRef<Path>) -> Result<ArtifactMetadata> {
    let path = path.as_ref();
    Ok(read_envelope(path)?.metadata().clone())
}
