use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::{ArchiveError, Record};

/// Append-only CSV table. The header goes in exactly once, when rows are first written to a
/// missing or empty file.
#[derive(Debug)]
pub struct CsvArchive {
    path: PathBuf,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows, returning how many were written.
    pub fn append(&mut self, records: &[Record]) -> Result<usize, ArchiveError> {
        if records.is_empty() {
            return Ok(0);
        }

        let io_err = |error| ArchiveError::Io {
            path: self.path.display().to_string(),
            error,
        };
        let csv_err = |error| ArchiveError::Csv {
            path: self.path.display().to_string(),
            error,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let write_header = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        for record in records {
            writer.serialize(record).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;

        Ok(records.len())
    }
}
