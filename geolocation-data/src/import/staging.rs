//! The staging file and the thread that owns it.

use std::{
    io,
    thread::{self, JoinHandle},
};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8;
use crossbeam_channel::Receiver;
use csv::{Terminator, WriterBuilder};
use geolocation_core::Record;
use log::{debug, error};

use super::{ImportError, handoff::StagingSignal};

const STAGING_SUFFIX: &str = "_sanitized.csv";
const WRITER_THREAD: &str = "staging-writer";

/// Derive the staging path for `source`.
///
/// The file is named after the source stem with `_sanitized.csv` appended
/// and placed in `staging_dir`, or next to the source when none is given.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use geolocation_data::import::staging_path_for;
///
/// let path = staging_path_for(Utf8Path::new("data/cities.csv"), None);
/// assert_eq!(path, "data/cities_sanitized.csv");
/// ```
#[must_use]
pub fn staging_path_for(source: &Utf8Path, staging_dir: Option<&Utf8Path>) -> Utf8PathBuf {
    let stem = source.file_stem().unwrap_or("import");
    let name = format!("{stem}{STAGING_SUFFIX}");
    match staging_dir.or_else(|| source.parent()) {
        Some(dir) => dir.join(name),
        None => Utf8PathBuf::from(name),
    }
}

/// Handle to the thread that writes sanitized records to the staging file.
///
/// The thread is the file's only owner. It writes every record it receives,
/// then flushes and closes the file once the channel is closed and fires the
/// [`StagingSignal`].
#[derive(Debug)]
pub struct StagingWriter {
    handle: JoinHandle<Result<(), ImportError>>,
}

impl StagingWriter {
    /// Start the writer thread.
    pub fn spawn(
        file: fs_utf8::File,
        path: Utf8PathBuf,
        records: Receiver<Record>,
        signal: StagingSignal,
    ) -> Result<Self, ImportError> {
        let handle = thread::Builder::new()
            .name(WRITER_THREAD.to_owned())
            .spawn(move || write_records(file, &path, &records, signal))
            .map_err(|source| ImportError::SpawnWorker {
                name: WRITER_THREAD.to_owned(),
                source,
            })?;
        Ok(Self { handle })
    }

    /// Wait for the writer to finish, surfacing any write failure.
    pub fn join(self) -> Result<(), ImportError> {
        self.handle
            .join()
            .map_err(|_| ImportError::WorkerPanicked {
                name: WRITER_THREAD.to_owned(),
            })?
    }
}

fn write_records(
    file: fs_utf8::File,
    path: &Utf8Path,
    records: &Receiver<Record>,
    signal: StagingSignal,
) -> Result<(), ImportError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);
    let mut staged: u64 = 0;
    let mut failure: Option<io::Error> = None;

    // Keep draining after a failure so workers never block on a full channel.
    for record in records {
        if failure.is_some() {
            continue;
        }
        match writer.write_record(record.as_fields()) {
            Ok(()) => staged += 1,
            Err(err) => {
                error!("failed to write {record} to staging file {path}: {err}");
                failure = Some(io::Error::from(err));
            }
        }
    }

    let flushed = match failure {
        Some(source) => Err(source),
        None => writer
            .into_inner()
            .map_err(csv::IntoInnerError::into_error)
            .and_then(|file| file.sync_all()),
    };
    if let Err(source) = flushed {
        return Err(ImportError::FlushStaging {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("staging file {path} closed with {staged} rows");
    signal.send(staged);
    Ok(())
}
