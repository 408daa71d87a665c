//! Feature transforms
//!
//! Each transform declares the columns it reads and the column it writes.
//! Fitting never touches the declaration: it returns a separate fitted value
//! that turns rows into wider rows.

mod columns;
mod encoder;
mod text_features;

pub use columns::{ColumnConcatenator, ColumnCopier, FittedConcatenator};
pub use encoder::{CategoricalEncoder, FittedCategoricalEncoder, OovPolicy};
pub use text_features::{FittedTextFeaturizer, TextFeaturizer, TextTokenizer};

use crate::data::{ColumnKind, Row, Schema, Value};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column name to kind, as seen by a step in the pipeline
pub type ColumnLayout = BTreeMap<String, ColumnKind>;

/// Starting layout: the raw schema columns
pub fn layout_of(schema: &Schema) -> ColumnLayout {
    schema
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.kind))
        .collect()
}

/// A declared, unfit transform
pub trait FeatureTransform {
    type Fitted: FittedTransform;

    /// Columns this transform reads
    fn inputs(&self) -> Vec<&str>;

    /// Column this transform writes
    fn output(&self) -> &str;

    /// Kind of the output column, given the columns available before this step
    fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind>;

    /// Learn state from rows that already carry this transform's inputs
    fn fit(&self, rows: &[Row]) -> Result<Self::Fitted>;
}

/// A fitted transform; applying it is stateless
pub trait FittedTransform {
    fn apply(&self, row: &mut Row) -> Result<()>;
}

/// Serializable declaration of one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformStep {
    FeaturizeText(TextFeaturizer),
    OneHot(CategoricalEncoder),
    Concatenate(ColumnConcatenator),
    Copy(ColumnCopier),
}

impl TransformStep {
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            TransformStep::FeaturizeText(t) => t.inputs(),
            TransformStep::OneHot(t) => t.inputs(),
            TransformStep::Concatenate(t) => t.inputs(),
            TransformStep::Copy(t) => t.inputs(),
        }
    }

    pub fn output(&self) -> &str {
        match self {
            TransformStep::FeaturizeText(t) => t.output(),
            TransformStep::OneHot(t) => t.output(),
            TransformStep::Concatenate(t) => t.output(),
            TransformStep::Copy(t) => t.output(),
        }
    }

    pub fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind> {
        match self {
            TransformStep::FeaturizeText(t) => t.output_kind(layout),
            TransformStep::OneHot(t) => t.output_kind(layout),
            TransformStep::Concatenate(t) => t.output_kind(layout),
            TransformStep::Copy(t) => t.output_kind(layout),
        }
    }

    pub fn fit(&self, rows: &[Row]) -> Result<FittedStep> {
        Ok(match self {
            TransformStep::FeaturizeText(t) => FittedStep::FeaturizeText(t.fit(rows)?),
            TransformStep::OneHot(t) => FittedStep::OneHot(t.fit(rows)?),
            TransformStep::Concatenate(t) => FittedStep::Concatenate(t.fit(rows)?),
            TransformStep::Copy(t) => FittedStep::Copy(t.fit(rows)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::FeaturizeText(_) => "featurize_text",
            TransformStep::OneHot(_) => "one_hot",
            TransformStep::Concatenate(_) => "concatenate",
            TransformStep::Copy(_) => "copy",
        }
    }
}

impl From<TextFeaturizer> for TransformStep {
    fn from(t: TextFeaturizer) -> Self {
        TransformStep::FeaturizeText(t)
    }
}

impl From<CategoricalEncoder> for TransformStep {
    fn from(t: CategoricalEncoder) -> Self {
        TransformStep::OneHot(t)
    }
}

impl From<ColumnConcatenator> for TransformStep {
    fn from(t: ColumnConcatenator) -> Self {
        TransformStep::Concatenate(t)
    }
}

impl From<ColumnCopier> for TransformStep {
    fn from(t: ColumnCopier) -> Self {
        TransformStep::Copy(t)
    }
}

/// Fitted state of one step, stored in the trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedStep {
    FeaturizeText(FittedTextFeaturizer),
    OneHot(FittedCategoricalEncoder),
    Concatenate(FittedConcatenator),
    Copy(ColumnCopier),
}

impl FittedStep {
    pub fn apply(&self, row: &mut Row) -> Result<()> {
        match self {
            FittedStep::FeaturizeText(t) => t.apply(row),
            FittedStep::OneHot(t) => t.apply(row),
            FittedStep::Concatenate(t) => t.apply(row),
            FittedStep::Copy(t) => t.apply(row),
        }
    }
}

/// Walk the steps in order, checking each input is available and recording outputs.
/// Returns the final layout.
pub fn validate_steps(schema: &Schema, steps: &[TransformStep]) -> Result<ColumnLayout> {
    let mut layout = layout_of(schema);
    for (i, step) in steps.iter().enumerate() {
        for input in step.inputs() {
            if !layout.contains_key(input) {
                return Err(KolosalError::SchemaMismatch(format!(
                    "step {} ({}) reads '{}', which is neither a schema column nor produced by an earlier step",
                    i,
                    step.name(),
                    input
                )));
            }
        }
        if layout.contains_key(step.output()) {
            return Err(KolosalError::SchemaMismatch(format!(
                "step {} ({}) writes '{}', which already exists",
                i,
                step.name(),
                step.output()
            )));
        }
        let kind = step.output_kind(&layout)?;
        layout.insert(step.output().to_string(), kind);
    }
    Ok(layout)
}

pub(crate) fn require_kind(
    layout: &ColumnLayout,
    column: &str,
    allowed: &[ColumnKind],
    transform: &str,
) -> Result<ColumnKind> {
    let kind = layout.get(column).copied().ok_or_else(|| {
        KolosalError::SchemaMismatch(format!("{} input '{}' is not available", transform, column))
    })?;
    if !allowed.contains(&kind) {
        return Err(KolosalError::SchemaMismatch(format!(
            "{} input '{}' is {}, expected one of {:?}",
            transform, column, kind, allowed
        )));
    }
    Ok(kind)
}

pub(crate) fn missing_column(column: &str) -> KolosalError {
    KolosalError::SchemaMismatch(format!("row is missing column '{}'", column))
}

pub(crate) fn text_cell<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    match row.get(column) {
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(KolosalError::SchemaMismatch(format!(
            "column '{}' must hold text, got {:?}",
            column, other
        ))),
        None => Err(missing_column(column)),
    }
}
