//! Serializable pipeline declaration

use super::Pipeline;
use crate::data::{DatasetLoader, Schema, TextFormat};
use crate::error::{KolosalError, Result};
use crate::feature_engineering::TransformStep;
use crate::training::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to load data and fit a model, as one JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub schema: Schema,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
    pub trainer: TrainerConfig,
}

impl PipelineConfig {
    pub fn new(schema: Schema, trainer: TrainerConfig) -> Self {
        Self {
            schema,
            format: TextFormat::default(),
            transforms: Vec::new(),
            trainer,
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_transform(mut self, step: impl Into<TransformStep>) -> Self {
        self.transforms.push(step.into());
        self
    }

    /// Loader for datasets laid out as this config declares
    pub fn loader(&self) -> DatasetLoader {
        DatasetLoader::new(self.schema.clone()).with_format(self.format)
    }

    /// Validate wiring and build the unfit pipeline
    pub fn build(&self) -> Result<Pipeline> {
        Pipeline::new(
            self.schema.clone(),
            self.transforms.clone(),
            self.trainer.clone(),
        )
        .map(|p| p.with_format(self.format))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KolosalError::ConfigError(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            KolosalError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Write a config file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
