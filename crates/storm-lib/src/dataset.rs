//! Delimited text loading for storm observations
//!
//! Rows are read positionally into the four `StormRecord` columns. Any
//! malformed row fails the whole load; a partial dataset is never returned.

use crate::error::{Result, StormError};
use crate::models::{Schema, StormField, StormRecord};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

const STREAM_SOURCE: &str = "<stream>";

/// Layout of the delimited input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            has_header: true,
        }
    }
}

/// Ordered, read-only collection of storm records
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<StormRecord>,
    schema: Schema,
}

impl Dataset {
    pub fn from_records(records: Vec<StormRecord>) -> Self {
        Self {
            records,
            schema: Schema::storm(),
        }
    }

    /// Load a dataset from a delimited file
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StormError::from_io(path, e))?;
        let dataset = Self::parse(file, options, path)?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Loaded storm dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from any reader
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self> {
        Self::parse(reader, options, Path::new(STREAM_SOURCE))
    }

    fn parse<R: Read>(reader: R, options: &LoadOptions, source: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_header)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| csv_read_error(source, e))?;
            records.push(parse_row(&row)?);
        }

        debug!(source = %source.display(), rows = records.len(), "Parsed delimited rows");
        Ok(Self::from_records(records))
    }

    /// Write the dataset back in the delimited shape it was loaded from
    pub fn write_delimited<W: Write>(&self, writer: W, options: &LoadOptions) -> Result<()> {
        self.write_to(writer, options, Path::new(STREAM_SOURCE))
    }

    pub fn save(&self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| StormError::from_io(path, e))?;
        self.write_to(file, options, path)
    }

    fn write_to<W: Write>(&self, writer: W, options: &LoadOptions, target: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);

        if options.has_header {
            writer
                .write_record(self.schema.column_names())
                .map_err(|e| csv_write_error(target, e))?;
        }
        for record in &self.records {
            writer
                .write_record(record.columns().iter().map(|v| v.to_string()))
                .map_err(|e| csv_write_error(target, e))?;
        }
        writer.flush().map_err(|e| StormError::from_io(target, e))?;
        Ok(())
    }

    pub fn records(&self) -> &[StormRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &StormRecord> {
        self.records.iter()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_row(row: &StringRecord) -> Result<StormRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or(0);

    if row.len() < StormField::COUNT {
        return Err(StormError::Parse {
            line,
            message: format!(
                "expected {} columns, found {}",
                StormField::COUNT,
                row.len()
            ),
        });
    }

    let mut values = [0.0f32; StormField::COUNT];
    for field in StormField::ALL {
        let cell = &row[field.index()];
        values[field.index()] = cell.parse::<f32>().map_err(|_| StormError::Parse {
            line,
            message: format!("column {} is not numeric: {:?}", field, cell),
        })?;
    }
    Ok(StormRecord::from_columns(values))
}

fn csv_read_error(source: &Path, err: csv::Error) -> StormError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(e) => StormError::from_io(source, e),
        other => StormError::Parse {
            line,
            message: format!("{:?}", other),
        },
    }
}

fn csv_write_error(target: &Path, err: csv::Error) -> StormError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => StormError::from_io(target, e),
        other => StormError::Io {
            path: target.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
        },
    }
}
