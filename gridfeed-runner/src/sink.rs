//! CSV sink: writes each published batch to its own timestamped file.
//!
//! Files are named `{stem}-{YYYY-MM-DD HH-MM-SS}.csv` under the output
//! directory, with columns `date,value,keys,name`. A second batch inside the
//! same second gets a numeric suffix rather than overwriting the first.

use gridfeed_core::{Record, Subscriber, SubscriberError, RECORD_COLUMNS};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV: {0}")]
    Flush(#[from] std::io::Error),
}

/// Subscriber that persists record batches as CSV.
#[derive(Debug)]
pub struct CsvSink {
    output_dir: PathBuf,
    file_stem: String,
    last_written: Mutex<Option<PathBuf>>,
}

impl CsvSink {
    /// Create the sink, creating `output_dir` if it does not exist.
    pub fn new(output_dir: impl Into<PathBuf>, file_stem: impl Into<String>) -> Result<Self, SinkError> {
        let output_dir = output_dir.into();
        ensure_dir(&output_dir)?;
        Ok(Self {
            output_dir,
            file_stem: file_stem.into(),
            last_written: Mutex::new(None),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the most recent file written by this sink.
    pub fn last_written(&self) -> Option<PathBuf> {
        self.last_written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Write `records` to a new file and return its path.
    pub fn write_batch(&self, records: &[Record]) -> Result<PathBuf, SinkError> {
        ensure_dir(&self.output_dir)?;
        let path = self.next_path();

        let file = File::create(&path).map_err(|source| SinkError::CreateFile {
            path: path.clone(),
            source,
        })?;
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(RECORD_COLUMNS)?;
        for r in records {
            wtr.write_record([
                r.date.format(DATE_FORMAT).to_string().as_str(),
                format_value(r.value).as_str(),
                r.keys.as_str(),
                r.name.as_str(),
            ])?;
        }
        wtr.flush()?;

        tracing::info!(path = %path.display(), records = records.len(), "wrote CSV");
        *self
            .last_written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(path.clone());
        Ok(path)
    }

    fn next_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format(FILE_TIMESTAMP_FORMAT);
        let base = format!("{}-{stamp}", self.file_stem);

        let mut path = self.output_dir.join(format!("{base}.csv"));
        let mut n = 1;
        while path.exists() {
            path = self.output_dir.join(format!("{base}-{n}.csv"));
            n += 1;
        }
        path
    }
}

impl Subscriber for CsvSink {
    fn update(&self, records: &[Record]) -> Result<(), SubscriberError> {
        self.write_batch(records)?;
        Ok(())
    }
}

/// Whole numbers keep their fractional part (`8.0`, not `8`) so the value
/// column always reads as floating point.
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

fn ensure_dir(path: &Path) -> Result<(), SinkError> {
    std::fs::create_dir_all(path).map_err(|source| SinkError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
