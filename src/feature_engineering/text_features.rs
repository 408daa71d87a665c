//! Text feature extraction

use super::{require_kind, text_cell, ColumnLayout, FeatureTransform, FittedTransform};
use crate::data::{ColumnKind, Row, Value};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Simple text tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTokenizer {
    lowercase: bool,
    min_token_length: usize,
}

impl TextTokenizer {
    pub fn new() -> Self {
        Self {
            lowercase: true,
            min_token_length: 1,
        }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let processed = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        processed
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .filter(|s| s.chars().count() >= self.min_token_length)
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for TextTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

fn default_max_features() -> usize {
    1000
}

fn default_normalize() -> bool {
    true
}

/// Bag-of-n-grams featurizer for one text column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeaturizer {
    pub input: String,
    pub output: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default)]
    pub tokenizer: TextTokenizer,
}

impl TextFeaturizer {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ngram_range: default_ngram_range(),
            max_features: default_max_features(),
            normalize: default_normalize(),
            tokenizer: TextTokenizer::new(),
        }
    }

    pub fn with_ngram_range(mut self, min: usize, max: usize) -> Self {
        self.ngram_range = (min.max(1), max.max(min.max(1)));
        self
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = n;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: TextTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

fn generate_ngrams(tokens: &[String], (min_n, max_n): (usize, usize)) -> Vec<String> {
    let mut ngrams = Vec::new();
    for n in min_n.max(1)..=max_n {
        if tokens.len() >= n {
            for window in tokens.windows(n) {
                ngrams.push(window.join(" "));
            }
        }
    }
    ngrams
}

impl FeatureTransform for TextFeaturizer {
    type Fitted = FittedTextFeaturizer;

    fn inputs(&self) -> Vec<&str> {
        vec![self.input.as_str()]
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn output_kind(&self, layout: &ColumnLayout) -> Result<ColumnKind> {
        require_kind(layout, &self.input, &[ColumnKind::Text], "featurize_text")?;
        if self.ngram_range.0 == 0 || self.ngram_range.0 > self.ngram_range.1 {
            return Err(KolosalError::invalid_parameter(
                "ngram_range",
                format!("{:?}", self.ngram_range),
                "must satisfy 1 <= min <= max",
            ));
        }
        if self.max_features == 0 {
            return Err(KolosalError::invalid_parameter(
                "max_features",
                self.max_features,
                "must be at least 1",
            ));
        }
        Ok(ColumnKind::Vector)
    }

    fn fit(&self, rows: &[Row]) -> Result<FittedTextFeaturizer> {
        if rows.is_empty() {
            return Err(KolosalError::EmptyDataset(format!(
                "no documents to build a vocabulary for '{}'",
                self.input
            )));
        }

        // Document frequency; BTreeMap keeps ranking independent of hash order
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            let tokens = self.tokenizer.tokenize(text_cell(row, &self.input)?);
            let unique: BTreeSet<String> =
                generate_ngrams(&tokens, self.ngram_range).into_iter().collect();
            for ngram in unique {
                *doc_freq.entry(ngram).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let vocabulary: BTreeMap<String, usize> = ranked
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();

        debug!(
            input = %self.input,
            vocabulary = vocabulary.len(),
            documents = rows.len(),
            "fitted text featurizer"
        );

        Ok(FittedTextFeaturizer {
            input: self.input.clone(),
            output: self.output.clone(),
            ngram_range: self.ngram_range,
            normalize: self.normalize,
            tokenizer: self.tokenizer.clone(),
            vocabulary,
        })
    }
}

/// Text featurizer with a frozen vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTextFeaturizer {
    input: String,
    output: String,
    ngram_range: (usize, usize),
    normalize: bool,
    tokenizer: TextTokenizer,
    vocabulary: BTreeMap<String, usize>,
}

impl FittedTextFeaturizer {
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Terms in output-slot order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.clone();
        }
        names
    }

    pub fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut counts = vec![0.0; self.vocabulary.len()];
        let tokens = self.tokenizer.tokenize(text);
        for ngram in generate_ngrams(&tokens, self.ngram_range) {
            if let Some(&idx) = self.vocabulary.get(&ngram) {
                counts[idx] += 1.0;
            }
        }

        if self.normalize {
            let norm = counts.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                counts.iter_mut().for_each(|v| *v /= norm);
            }
        }
        counts
    }
}

impl FittedTransform for FittedTextFeaturizer {
    fn apply(&self, row: &mut Row) -> Result<()> {
        let features = self.vectorize(text_cell(row, &self.input)?);
        row.insert(self.output.clone(), Value::Vector(features));
        Ok(())
    }
}
