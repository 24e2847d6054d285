//! One-shot completion notice between the staging writer and the loader.
//!
//! [`rendezvous`] returns a connected pair. Both halves are consumed on use,
//! so the notice can be sent at most once and awaited at most once.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;

use super::ImportError;

/// Sending half, held by the staging writer.
#[derive(Debug)]
pub struct StagingSignal {
    sender: Sender<u64>,
}

/// Receiving half, held by the importer ahead of the bulk load.
#[derive(Debug)]
pub struct StagingReady {
    receiver: Receiver<u64>,
}

/// Create a connected signal/ready pair.
///
/// The slot holds exactly one value, so sending never blocks even if the
/// receiver has not started waiting yet.
#[must_use]
pub fn rendezvous() -> (StagingSignal, StagingReady) {
    let (sender, receiver) = bounded(1);
    (StagingSignal { sender }, StagingReady { receiver })
}

impl StagingSignal {
    /// Announce that the staging file is flushed and closed, carrying the
    /// number of rows written to it.
    pub fn send(self, staged_rows: u64) {
        if self.sender.send(staged_rows).is_err() {
            debug!("staging completion ignored; import already abandoned");
        }
    }
}

impl StagingReady {
    /// Block until the staging file is complete.
    ///
    /// Returns [`ImportError::StagingAbandoned`] when the signal was dropped
    /// without being sent.
    pub fn wait(self) -> Result<u64, ImportError> {
        self.receiver
            .recv()
            .map_err(|_| ImportError::StagingAbandoned)
    }
}
