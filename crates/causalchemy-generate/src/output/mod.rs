//! Table writers.

pub mod csv;

pub use self::csv::{write_csv, write_table_csv};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::GenerationError;
use crate::table::OutputTable;

/// File names used inside a run directory.
pub const DATASET_CSV: &str = "data.csv";
pub const DATASET_JSON: &str = "data.json";
pub const GENERATION_REPORT: &str = "generation_report.json";

/// Write a table as a pretty JSON object of columns.
pub fn write_table_json(path: &Path, table: &OutputTable) -> Result<(), GenerationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, table)?;
    writer.flush()?;
    Ok(())
}
