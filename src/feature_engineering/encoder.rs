//! One-hot encoding of categorical columns

use super::{require_kind, text_cell, ColumnLayout, FeatureTransform, FittedTransform};
use crate::data::{ColumnKind, Row, Value};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What to do with a category never seen during fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OovPolicy {
    /// Encode as the all-zero vector
    #[default]
    Zero,
    /// Fail with `UnknownCategory`
    Reject,
}

/// One-hot encoder for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub oov: OovPolicy,
}

impl CategoricalEncoder {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            oov: OovPolicy::Zero,
        }
    }

    pub fn with_oov_policy(mut self, oov: OovPolicy) -> Self {
        self.oov = oov;
        self
    }
}

impl FeatureTransform for CategoricalEncoder {
    type Fitted = FittedCategoricalEncoder;

    fn inputs(&self) -> Vec<&str> {
        vec![self.input.as_str()]
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind> {
        require_kind(
            layout,
            &self.input,
            &[ColumnKind::Categorical, ColumnKind::Text],
            "one_hot",
        )?;
        Ok(ColumnKind::Vector)
    }

    fn fit(&self, rows: &[Row]) -> Result<FittedCategoricalEncoder> {
        // Categories in first-seen order
        let mut categories: Vec<String> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            let value = text_cell(row, &self.input)?;
            if !seen.contains_key(value) {
                seen.insert(value, categories.len());
                categories.push(value.to_string());
            }
        }

        if categories.is_empty() {
            return Err(KolosalError::EmptyDataset(format!(
                "no values to encode in '{}'",
                self.input
            )));
        }

        debug!(input = %self.input, categories = categories.len(), "fitted one-hot encoder");

        Ok(FittedCategoricalEncoder {
            input: self.input.clone(),
            output: self.output.clone(),
            oov: self.oov,
            categories,
        })
    }
}

/// One-hot encoder with a frozen category list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCategoricalEncoder {
    input: String,
    output: String,
    oov: OovPolicy,
    categories: Vec<String>,
}

impl FittedCategoricalEncoder {
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn encode(&self, value: &str) -> Result<Vec<f64>> {
        let mut encoded = vec![0.0; self.categories.len()];
        match self.categories.iter().position(|c| c == value) {
            Some(idx) => encoded[idx] = 1.0,
            None if self.oov == OovPolicy::Reject => {
                return Err(KolosalError::UnknownCategory {
                    column: self.input.clone(),
                    value: value.to_string(),
                })
            }
            None => {}
        }
        Ok(encoded)
    }
}

impl FittedTransform for FittedCategoricalEncoder {
    fn apply(&self, row: &mut Row) -> Result<()> {
        let encoded = self.encode(text_cell(row, &self.input)?)?;
        row.insert(self.output.clone(), Value::Vector(encoded));
        Ok(())
    }
}
