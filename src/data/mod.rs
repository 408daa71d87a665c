//! Data module
//!
//! Schemas, typed rows and the streaming delimited-text loader.

mod loader;
mod schema;

pub use loader::{load, Dataset, DatasetLoader, TextFormat};
pub use schema::{Column, ColumnKind, Row, Schema, Value};
