//! Error types for the Kolosal pipeline framework

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kolosal operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the Kolosal pipeline framework
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Label type mismatch: column '{column}' is {actual}, trainer expects {expected}")]
    LabelTypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Parse error at row {row}, column '{column}': cannot read '{value}' as {expected}")]
    ParseError {
        row: usize,
        column: String,
        value: String,
        expected: String,
    },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Artifact error at {}: {reason}", path.display())]
    ArtifactIo { path: PathBuf, reason: String },

    #[error("Cannot read dataset {}: {source}", path.display())]
    DatasetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Non-finite value at row {row} in {column}")]
    NonFiniteValue { row: usize, column: String },

    #[error("Label column '{0}' has zero variance")]
    ConstantLabel(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KolosalError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KolosalError::ArtifactIo {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        KolosalError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KolosalError::ParseError {
            row: 3,
            column: "TripTime".to_string(),
            value: "abc".to_string(),
            expected: "numeric".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Parse error at row 3, column 'TripTime': cannot read 'abc' as numeric"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KolosalError = io_err.into();
        assert!(matches!(err, KolosalError::IoError(_)));
    }

    #[test]
    fn test_artifact_error_carries_path() {
        let err = KolosalError::artifact("/tmp/model.kplm", "file not found");
        assert!(err.to_string().contains("/tmp/model.kplm"));
    }
}
