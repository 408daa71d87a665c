//! Column schema, typed cell values and rows

use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Real-valued scalar
    Numeric,
    /// Free text, featurized by tokenization
    Text,
    /// String drawn from a small vocabulary
    Categorical,
    /// Two-valued label
    Boolean,
    /// Fixed-width numeric vector. Only transforms produce these.
    Vector,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Vector(Vec<f64>),
}

impl Value {
    /// Whether this value may occupy a column of the given kind.
    /// Numeric columns hold finite numbers only.
    pub fn conforms_to(&self, kind: ColumnKind) -> bool {
        match (self, kind) {
            (Value::Number(v), ColumnKind::Numeric) => v.is_finite(),
            (Value::Text(_), ColumnKind::Text | ColumnKind::Categorical) => true,
            (Value::Bool(_), ColumnKind::Boolean) => true,
            (Value::Vector(_), ColumnKind::Vector) => true,
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Vector(_) => "vector",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

/// One record: column name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// A named, typed slot at a fixed position of a delimited line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ordinal: usize,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, ordinal: usize, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            ordinal,
            kind,
        }
    }

    pub fn numeric(name: impl Into<String>, ordinal: usize) -> Self {
        Self::new(name, ordinal, ColumnKind::Numeric)
    }

    pub fn text(name: impl Into<String>, ordinal: usize) -> Self {
        Self::new(name, ordinal, ColumnKind::Text)
    }

    pub fn categorical(name: impl Into<String>, ordinal: usize) -> Self {
        Self::new(name, ordinal, ColumnKind::Categorical)
    }

    pub fn boolean(name: impl Into<String>, ordinal: usize) -> Self {
        Self::new(name, ordinal, ColumnKind::Boolean)
    }

    /// Parse one raw cell into a typed value
    pub fn parse_cell(&self, raw: &str, row: usize) -> Result<Value> {
        let parse_error = |expected: &str| KolosalError::ParseError {
            row,
            column: self.name.clone(),
            value: raw.to_string(),
            expected: expected.to_string(),
        };

        match self.kind {
            ColumnKind::Numeric => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Number)
                .ok_or_else(|| parse_error("finite numeric")),
            ColumnKind::Text | ColumnKind::Categorical => Ok(Value::Text(raw.to_string())),
            ColumnKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(parse_error("boolean (true/false/1/0)")),
            },
            ColumnKind::Vector => Err(parse_error("vector")),
        }
    }
}

/// Ordered column definitions; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names or ordinals and vector columns
    pub fn new(mut columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(KolosalError::SchemaMismatch(
                "schema must declare at least one column".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut ordinals = HashSet::new();
        for col in &columns {
            if !names.insert(col.name.as_str()) {
                return Err(KolosalError::SchemaMismatch(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
            if !ordinals.insert(col.ordinal) {
                return Err(KolosalError::SchemaMismatch(format!(
                    "duplicate ordinal {} (column '{}')",
                    col.ordinal, col.name
                )));
            }
            if col.kind == ColumnKind::Vector {
                return Err(KolosalError::SchemaMismatch(format!(
                    "column '{}' cannot be declared as a vector; vectors are produced by transforms",
                    col.name
                )));
            }
        }

        columns.sort_by_key(|c| c.ordinal);
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|c| c.kind)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of fields a line must carry to cover every ordinal
    pub fn required_fields(&self) -> usize {
        self.columns.last().map(|c| c.ordinal + 1).unwrap_or(0)
    }

    /// Turn the split fields of one line into a typed row
    pub fn parse_fields<S: AsRef<str>>(&self, fields: &[S], row: usize) -> Result<Row> {
        if fields.len() < self.required_fields() {
            return Err(KolosalError::SchemaMismatch(format!(
                "row {} has {} fields, schema needs {}",
                row,
                fields.len(),
                self.required_fields()
            )));
        }

        let mut parsed = Row::new();
        for col in &self.columns {
            let value = col.parse_cell(fields[col.ordinal].as_ref(), row)?;
            parsed.insert(col.name.clone(), value);
        }
        Ok(parsed)
    }

    /// Check that a row carries exactly this schema's columns with matching types
    pub fn validate_row(&self, row: &Row, index: usize) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(KolosalError::SchemaMismatch(format!(
                "row {} has {} columns, schema declares {}",
                index,
                row.len(),
                self.columns.len()
            )));
        }
        for col in &self.columns {
            self.check_value(row, col, index)?;
        }
        Ok(())
    }

    /// Check a single column of a row that may carry only a subset of the schema
    pub fn check_column(&self, row: &Row, name: &str, index: usize) -> Result<()> {
        let col = self.column(name).ok_or_else(|| {
            KolosalError::SchemaMismatch(format!("column '{}' is not in the schema", name))
        })?;
        self.check_value(row, col, index)
    }

    fn check_value(&self, row: &Row, col: &Column, index: usize) -> Result<()> {
        match row.get(&col.name) {
            None => Err(KolosalError::SchemaMismatch(format!(
                "row {} is missing column '{}'",
                index, col.name
            ))),
            Some(value) if !value.conforms_to(col.kind) => {
                Err(KolosalError::SchemaMismatch(format!(
                    "row {}, column '{}': expected {}, got {}",
                    index,
                    col.name,
                    col.kind,
                    value.type_name()
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

impl TryFrom<Vec<Column>> for Schema {
    type Error = KolosalError;

    fn try_from(columns: Vec<Column>) -> Result<Self> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}
