//! Streaming loader for delimited text datasets

use super::schema::{Row, Schema};
use crate::error::{KolosalError, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Layout of a delimited text file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFormat {
    /// Field separator, usually ',' or '\t'
    pub delimiter: char,
    /// Skip the first line
    pub has_header: bool,
}

impl TextFormat {
    pub fn csv() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }

    pub fn tsv() -> Self {
        Self {
            delimiter: '\t',
            has_header: true,
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Split one record into fields with the same quoting rules the loader uses
    pub fn split_line(&self, line: &str) -> Result<Vec<String>> {
        let mut reader = self
            .reader_builder()?
            .has_headers(false)
            .from_reader(line.as_bytes());
        let mut record = StringRecord::new();
        if !reader.read_record(&mut record).map_err(|e| read_error(e, 0))? {
            return Ok(Vec::new());
        }
        Ok(record.iter().map(str::to_string).collect())
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                KolosalError::ConfigError(format!(
                    "delimiter {:?} is not a single ASCII character",
                    self.delimiter
                ))
            })
    }

    /// Reader settings for this layout. Rows may be ragged; arity is checked per row.
    fn reader_builder(&self) -> Result<ReaderBuilder> {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter_byte()?)
            .has_headers(self.has_header)
            .flexible(true);
        Ok(builder)
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::csv()
    }
}

/// Rows conforming to a schema; read-only once built
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from in-memory rows, validating every row against the schema
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            schema.validate_row(row, i)?;
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

/// Reads delimited files into a [`Dataset`] for one schema
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    schema: Schema,
    format: TextFormat,
}

impl DatasetLoader {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            format: TextFormat::default(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.format.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.format.has_header = has_header;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn format(&self) -> TextFormat {
        self.format
    }

    /// Load a file. The first malformed row aborts the load.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path).map_err(|source| KolosalError::DatasetIo {
            path: path.to_path_buf(),
            source,
        })?;

        let dataset = self.load_reader(BufReader::new(file)).map_err(|e| match e {
            KolosalError::IoError(source) => KolosalError::DatasetIo {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Load from any reader in one pass
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        let mut reader = self.format.reader_builder()?.from_reader(reader);

        if self.format.has_header {
            let header = reader.headers().map_err(|e| read_error(e, 0))?;
            debug!(header = ?header, "skipping header");
        }

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader
            .read_record(&mut record)
            .map_err(|e| read_error(e, rows.len()))?
        {
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let fields: Vec<&str> = record.iter().collect();
            let row = self.schema.parse_fields(&fields, rows.len())?;
            rows.push(row);
        }

        Ok(Dataset {
            schema: self.schema.clone(),
            rows,
        })
    }
}

/// Reader failures: IO stays IO, anything else is a malformed row
fn read_error(err: csv::Error, row: usize) -> KolosalError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => KolosalError::IoError(source),
        _ => KolosalError::SchemaMismatch(format!("row {}: {}", row, message)),
    }
}

/// Load `path` with an explicit schema and layout
pub fn load(
    path: impl AsRef<Path>,
    schema: &Schema,
    delimiter: char,
    has_header: bool,
) -> Result<Dataset> {
    DatasetLoader::new(schema.clone())
        .with_delimiter(delimiter)
        .with_header(has_header)
        .load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, Value};
    use std::io::Cursor;

    fn sentiment_loader() -> DatasetLoader {
        let schema = Schema::new(vec![
            Column::boolean("Label", 0),
            Column::text("SentimentText", 1),
        ])
        .unwrap();
        DatasetLoader::new(schema).with_format(TextFormat::tsv())
    }

    #[test]
    fn test_split_line_quotes() {
        let format = TextFormat::csv();
        assert_eq!(
            format.split_line(r#"a,"b,c",d"#).unwrap(),
            vec!["a".to_string(), "b,c".to_string(), "d".to_string()]
        );
        assert_eq!(
            format.split_line(r#""say ""hi""",x"#).unwrap(),
            vec![r#"say "hi""#.to_string(), "x".to_string()]
        );
        assert_eq!(format.split_line("a,,b").unwrap().len(), 3);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let format = TextFormat {
            delimiter: '¦',
            has_header: false,
        };
        assert!(matches!(
            format.split_line("a¦b").unwrap_err(),
            KolosalError::ConfigError(_)
        ));
    }

    #[test]
    fn test_quoted_field_spans_lines() {
        let data = "Sentiment\tText\n1\t\"rude\nand loud\"\n0\tthanks\n";
        let dataset = sentiment_loader().load_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.rows()[0].get("SentimentText"),
            Some(&Value::Text("rude\nand loud".into()))
        );
        assert_eq!(dataset.rows()[1].get("Label"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_unreadable_header_is_an_error() {
        let data: &[u8] = b"\xff\xfeSentiment\tText\n1\tok\n";
        let err = sentiment_loader().load_reader(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, KolosalError::SchemaMismatch(_)));
    }

    #[test]
    fn test_extra_trailing_fields_ignored() {
        let data = "Sentiment\tText\n1\tgo away\tunused\n";
        let dataset = sentiment_loader().load_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.rows()[0].len(), 2);
    }

    #[test]
    fn test_load_reader_skips_header_and_blank_lines() {
        let data = "Sentiment\tText\n1\tyou are awful\n\n0\tthanks for the edit\r\n";
        let dataset = sentiment_loader().load_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].get("Label"), Some(&Value::Bool(true)));
        assert_eq!(
            dataset.rows()[1].get("SentimentText"),
            Some(&Value::Text("thanks for the edit".into()))
        );
    }

    #[test]
    fn test_bad_label_aborts_with_row_index() {
        let data = "Sentiment\tText\n1\tok\n0\tfine\nmaybe\tbroken\n1\tnever read\n";
        let err = sentiment_loader().load_reader(Cursor::new(data)).unwrap_err();
        match err {
            KolosalError::ParseError { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Label");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_row_is_schema_mismatch() {
        let data = "Sentiment\tText\n1\n";
        let err = sentiment_loader().load_reader(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, KolosalError::SchemaMismatch(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = sentiment_loader().load("/definitely/not/here.tsv").unwrap_err();
        assert!(matches!(err, KolosalError::DatasetIo { .. }));
    }

    #[test]
    fn test_dataset_new_validates_rows() {
        let schema = Schema::new(vec![Column::numeric("x", 0)]).unwrap();
        let bad = vec![Row::new().with("x", "one")];
        assert!(Dataset::new(schema.clone(), bad).is_err());
        let good = vec![Row::new().with("x", 1.0)];
        assert_eq!(Dataset::new(schema, good).unwrap().len(), 1);
    }
}
