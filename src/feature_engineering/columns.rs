//! Column plumbing: concatenation and copying

use super::{missing_column, require_kind, ColumnLayout, FeatureTransform, FittedTransform};
use crate::data::{ColumnKind, Row, Value};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// Joins numeric and vector columns into one vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConcatenator {
    pub inputs: Vec<String>,
    pub output: String,
}

impl ColumnConcatenator {
    pub fn new<S: AsRef<str>>(inputs: &[S], output: impl Into<String>) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.as_ref().to_string()).collect(),
            output: output.into(),
        }
    }
}

fn cell_width(row: &Row, column: &str) -> Result<usize> {
    match row.get(column) {
        Some(Value::Number(_)) => Ok(1),
        Some(Value::Vector(v)) => Ok(v.len()),
        Some(other) => Err(KolosalError::SchemaMismatch(format!(
            "column '{}' cannot be concatenated: {:?}",
            column, other
        ))),
        None => Err(missing_column(column)),
    }
}

impl FeatureTransform for ColumnConcatenator {
    type Fitted = FittedConcatenator;

    fn inputs(&self) -> Vec<&str> {
        self.inputs.iter().map(String::as_str).collect()
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind> {
        if self.inputs.is_empty() {
            return Err(KolosalError::SchemaMismatch(format!(
                "concatenate into '{}' needs at least one input",
                self.output
            )));
        }
        for input in &self.inputs {
            require_kind(
                layout,
                input,
                &[ColumnKind::Numeric, ColumnKind::Vector],
                "concatenate",
            )?;
        }
        Ok(ColumnKind::Vector)
    }

    fn fit(&self, rows: &[Row]) -> Result<FittedConcatenator> {
        let first = rows.first().ok_or_else(|| {
            KolosalError::EmptyDataset(format!("no rows to size '{}'", self.output))
        })?;
        let widths = self
            .inputs
            .iter()
            .map(|input| cell_width(first, input))
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedConcatenator {
            inputs: self.inputs.clone(),
            output: self.output.clone(),
            widths,
        })
    }
}

/// Concatenator with per-input widths fixed at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedConcatenator {
    inputs: Vec<String>,
    output: String,
    widths: Vec<usize>,
}

impl FittedConcatenator {
    /// Total output width
    pub fn width(&self) -> usize {
        self.widths.iter().sum()
    }
}

impl FittedTransform for FittedConcatenator {
    fn apply(&self, row: &mut Row) -> Result<()> {
        let mut merged = Vec::with_capacity(self.width());
        for (input, &width) in self.inputs.iter().zip(&self.widths) {
            match row.get(input) {
                Some(Value::Number(v)) if width == 1 => merged.push(*v),
                Some(Value::Vector(v)) if v.len() == width => merged.extend_from_slice(v),
                Some(Value::Number(_)) | Some(Value::Vector(_)) => {
                    return Err(KolosalError::SchemaMismatch(format!(
                        "column '{}' has width {}, expected {}",
                        input,
                        cell_width(row, input)?,
                        width
                    )))
                }
                Some(other) => {
                    return Err(KolosalError::SchemaMismatch(format!(
                        "column '{}' cannot be concatenated: {:?}",
                        input, other
                    )))
                }
                None => return Err(missing_column(input)),
            }
        }
        row.insert(self.output.clone(), Value::Vector(merged));
        Ok(())
    }
}

/// Copies a column under a new name; stateless
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCopier {
    pub input: String,
    pub output: String,
}

impl ColumnCopier {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl FeatureTransform for ColumnCopier {
    type Fitted = ColumnCopier;

    fn inputs(&self) -> Vec<&str> {
        vec![self.input.as_str()]
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind> {
        layout
            .get(&self.input)
            .copied()
            .ok_or_else(|| missing_column(&self.input))
    }

    fn fit(&self, _rows: &[Row]) -> Result<ColumnCopier> {
        Ok(self.clone())
    }
}

impl FittedTransform for ColumnCopier {
    fn apply(&self, row: &mut Row) -> Result<()> {
        let value = row
            .get(&self.input)
            .cloned()
            .ok_or_else(|| missing_column(&self.input))?;
        row.insert(self.output.clone(), value);
        Ok(())
    }
}
