//! Fatal failures raised by an import.

use std::io;

use camino::Utf8PathBuf;
use geolocation_core::BulkLoadError;
use thiserror::Error;

/// Errors that abort an import.
///
/// Malformed rows and rejected records are not errors; they are logged and
/// counted as discarded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// The source path does not end in `.csv`.
    #[error("unsupported source file {path}: expected a .csv extension")]
    UnsupportedExtension {
        /// Path supplied by the caller.
        path: Utf8PathBuf,
    },
    /// The source file could not be opened.
    #[error("failed to open source file {path}")]
    OpenSource {
        /// Path supplied by the caller.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The first line is missing or does not list the expected columns.
    #[error("unexpected header in {path}: found {found:?}")]
    HeaderMismatch {
        /// Path of the source file.
        path: Utf8PathBuf,
        /// Columns actually present, empty when no header could be read.
        found: Vec<String>,
    },
    /// Reading from the source failed part-way through.
    #[error("failed to read source file {path}")]
    ReadSource {
        /// Path of the source file.
        path: Utf8PathBuf,
        /// Error reported by the CSV reader.
        #[source]
        source: csv::Error,
    },
    /// The staging file could not be created.
    #[error("failed to create staging file {path}")]
    CreateStaging {
        /// Intended staging path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A pipeline thread could not be started.
    #[error("failed to spawn {name} thread")]
    SpawnWorker {
        /// Name given to the thread.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A pipeline thread panicked.
    #[error("{name} thread panicked")]
    WorkerPanicked {
        /// Name given to the thread.
        name: String,
    },
    /// Writing or flushing the staging file failed.
    #[error("failed to write staging file {path}")]
    FlushStaging {
        /// Staging file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The staging writer went away without announcing completion.
    #[error("staging writer exited without signalling completion")]
    StagingAbandoned,
    /// The bulk loader reported an error.
    #[error("failed to load staging file {path}")]
    Load {
        /// Staging file handed to the loader.
        path: Utf8PathBuf,
        /// Error reported by the loader.
        #[source]
        source: BulkLoadError,
    },
}
