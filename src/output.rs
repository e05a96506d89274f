use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;
use tracing::debug;

use crate::table::{Table, COLUMNS};
use crate::LoadGenError;

/// File name of the exported table inside a run directory.
pub const CSV_FILE_NAME: &str = "load.csv";

/// Persists a finished (or partial) table.
pub trait TableExporter {
    fn export(&mut self, table: &Table, destination: &Path) -> Result<(), LoadGenError>;
}

/// Writes the table as CSV with a header row, even when the table is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl TableExporter for CsvExporter {
    fn export(&mut self, table: &Table, destination: &Path) -> Result<(), LoadGenError> {
        write_csv(destination, table)
    }
}

pub fn write_csv(path: &Path, table: &Table) -> Result<(), LoadGenError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in table.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(rows = table.len(), path = %path.display(), "wrote csv");
    Ok(())
}

/// Create `<output_root>/<UTC timestamp>`, appending a counter on collision.
pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, LoadGenError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}
