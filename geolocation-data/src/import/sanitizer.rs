//! Worker pool that validates records in parallel.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use geolocation_core::{Record, Validator};
use log::{debug, error, warn};

use super::ImportError;

/// A running set of sanitizer threads.
///
/// Each worker pulls records until the input channel is closed and drained,
/// forwarding accepted records to the staging writer.
#[derive(Debug)]
pub struct SanitizerPool {
    workers: Vec<(String, JoinHandle<u64>)>,
}

impl SanitizerPool {
    /// Start `workers` threads (at least one).
    ///
    /// The pool keeps clones of `rows` and `staged` only inside its threads,
    /// so closing the reader side ends the pool, and the pool ending closes
    /// the writer side.
    pub fn spawn(
        workers: usize,
        validator: &Arc<Validator>,
        rows: Receiver<Record>,
        staged: Sender<Record>,
    ) -> Result<Self, ImportError> {
        let count = workers.max(1);
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let name = format!("sanitizer-{index}");
            let rows = rows.clone();
            let staged = staged.clone();
            let validator = Arc::clone(validator);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || sanitize_rows(&validator, &rows, &staged))
                .map_err(|source| ImportError::SpawnWorker {
                    name: name.clone(),
                    source,
                })?;
            handles.push((name, handle));
        }
        debug!("started {count} sanitizer workers");
        Ok(Self { workers: handles })
    }

    /// Number of running workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait for every worker to exit and return how many records they
    /// rejected in total.
    pub fn join(self) -> Result<u64, ImportError> {
        let mut rejected = 0;
        let mut panicked = None;
        for (name, handle) in self.workers {
            match handle.join() {
                Ok(count) => rejected += count,
                Err(_) => {
                    error!("{name} panicked");
                    panicked.get_or_insert(name);
                }
            }
        }
        match panicked {
            Some(name) => Err(ImportError::WorkerPanicked { name }),
            None => Ok(rejected),
        }
    }
}

fn sanitize_rows(validator: &Validator, rows: &Receiver<Record>, staged: &Sender<Record>) -> u64 {
    let mut rejected = 0;
    for mut record in rows {
        match validator.sanitize(&mut record) {
            Ok(()) => {
                if staged.send(record).is_err() {
                    error!("staging writer stopped; sanitizer exiting");
                    break;
                }
            }
            Err(err) => {
                warn!("data rejected: {err}, value: {}", err.value);
                rejected += 1;
            }
        }
    }
    debug!("sanitizer finished with {rejected} rejections");
    rejected
}
