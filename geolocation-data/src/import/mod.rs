//! Concurrent CSV import pipeline.
//!
//! An import runs in three stages. The calling thread reads the source and
//! publishes rows onto a bounded channel. A pool of sanitizer threads
//! validates them, and a single writer thread owns the staging file. Once
//! the writer has flushed and closed the file it fires a one-shot signal,
//! and only then does the [`BulkLoader`] read it.
//!
//! Row order in the staging file is not preserved.

use std::{fmt, sync::Arc, time::Instant};

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::bounded;
use geolocation_core::{BulkLoader, ImportSummary, Validator};
use log::{debug, error, info};

mod error;
pub mod handoff;
mod reader;
mod sanitizer;
mod staging;

pub use error::ImportError;
pub use handoff::{StagingReady, StagingSignal, rendezvous};
pub use reader::{CsvSource, ReadReport};
pub use sanitizer::SanitizerPool;
pub use staging::{StagingWriter, staging_path_for};

use crate::fs::{create_utf8_file, remove_utf8_file};

const SOURCE_EXTENSION: &str = "csv";

/// Per-stage row counts for one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitizeReport {
    /// Data rows read, header excluded.
    pub total_rows: u64,
    /// Rows skipped by the reader.
    pub malformed_rows: u64,
    /// Rows rejected by the validator.
    pub rejected_rows: u64,
    /// Rows written to the staging file.
    pub staged_rows: u64,
}

impl fmt::Display for SanitizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows read, {} malformed, {} rejected, {} staged",
            self.total_rows, self.malformed_rows, self.rejected_rows, self.staged_rows
        )
    }
}

/// Drives imports into a [`BulkLoader`].
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use geolocation_core::Validator;
/// use geolocation_data::{SqliteStore, StoreConfig, import::Importer};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteStore::connect(&StoreConfig::default())?;
/// store.create_schema()?;
/// let mut importer = Importer::new(store, Validator::standard()?);
/// let summary = importer.import_csv(Utf8Path::new("data.csv"), 4)?;
/// println!("{} accepted", summary.accepted_rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Importer<L> {
    loader: L,
    validator: Arc<Validator>,
    staging_dir: Option<Utf8PathBuf>,
}

impl<L: BulkLoader> Importer<L> {
    /// Build an importer that stages files next to their source.
    pub fn new(loader: L, validator: Validator) -> Self {
        Self {
            loader,
            validator: Arc::new(validator),
            staging_dir: None,
        }
    }

    /// Place staging files in `dir` instead of next to the source.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Borrow the underlying loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Consume the importer, returning the loader.
    pub fn into_loader(self) -> L {
        self.loader
    }

    /// Import `path` using `concurrency` sanitizer threads.
    ///
    /// A concurrency of zero is treated as one. The staging file is removed
    /// once loading has been attempted, whatever its outcome; a failure to
    /// remove it is logged only.
    pub fn import_csv(
        &mut self,
        path: &Utf8Path,
        concurrency: usize,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        if path.extension() != Some(SOURCE_EXTENSION) {
            return Err(ImportError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }
        let workers = concurrency.max(1);
        info!("importing {path} with {workers} workers");

        let source = CsvSource::open(path)?;
        let staging_path = staging_path_for(path, self.staging_dir.as_deref());
        let file = create_utf8_file(&staging_path).map_err(|source| {
            ImportError::CreateStaging {
                path: staging_path.clone(),
                source,
            }
        })?;

        let (report, inserted) = self.stage_and_load(source, file, &staging_path, workers)?;
        info!("sanitized {path}: {report}");

        let summary = ImportSummary::from_counts(report.total_rows, inserted, started.elapsed());
        info!(
            "imported {path}: {} accepted, {} discarded in {:.3}s",
            summary.accepted_rows,
            summary.discarded_rows,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Run the pipeline into `file`, then hand the staging file to the
    /// loader. The staging file is removed on every path out.
    fn stage_and_load(
        &mut self,
        source: CsvSource,
        file: cap_std::fs_utf8::File,
        staging_path: &Utf8Path,
        workers: usize,
    ) -> Result<(SanitizeReport, u64), ImportError> {
        let report = match self.stage(source, file, staging_path, workers) {
            Ok(report) => report,
            Err(err) => {
                discard_staging(staging_path);
                return Err(err);
            }
        };

        let loaded = self
            .loader
            .load(staging_path.as_std_path())
            .map_err(|source| ImportError::Load {
                path: staging_path.to_path_buf(),
                source,
            });
        discard_staging(staging_path);
        Ok((report, loaded?))
    }

    fn stage(
        &self,
        source: CsvSource,
        file: cap_std::fs_utf8::File,
        staging_path: &Utf8Path,
        workers: usize,
    ) -> Result<SanitizeReport, ImportError> {
        let (signal, ready) = rendezvous();
        let (rows_tx, rows_rx) = bounded(workers);
        let (staged_tx, staged_rx) = bounded(workers);

        let writer = StagingWriter::spawn(file, staging_path.to_path_buf(), staged_rx, signal)?;
        let pool = SanitizerPool::spawn(workers, &self.validator, rows_rx, staged_tx)?;

        debug!("publishing rows from {} to {staging_path}", source.path());
        let read = source.publish(rows_tx);
        let rejected = pool.join();
        let staged = ready.wait();
        let written = writer.join();

        let read = read?;
        let rejected_rows = rejected?;
        written?;
        let staged_rows = staged?;

        Ok(SanitizeReport {
            total_rows: read.total_rows,
            malformed_rows: read.malformed_rows,
            rejected_rows,
            staged_rows,
        })
    }
}

fn discard_staging(path: &Utf8Path) {
    if let Err(err) = remove_utf8_file(path) {
        error!("failed to remove staging file {path}: {err}");
    }
}

#[cfg(test)]
mod tests;
