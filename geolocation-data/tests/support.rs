//! Test doubles shared by the behaviour suites.

use geolocation_core::{BulkLoadError, BulkLoader};
use std::{fs, io, path::Path};

/// Header line expected by the importer.
pub const HEADER: &str = "address,country_code,country,city,latitude,longitude,auxiliary_value";

/// Captures the staging file handed to it and reports every line inserted.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    /// Lines read from the staging file on the last call.
    pub lines: Vec<String>,
    /// Number of calls made.
    pub calls: usize,
    /// Fail every load after reading the staging file.
    pub fail: bool,
}

impl RecordingLoader {
    /// A loader whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl BulkLoader for RecordingLoader {
    fn load(&mut self, staging: &Path) -> Result<u64, BulkLoadError> {
        self.calls += 1;
        let contents = fs::read_to_string(staging).map_err(BulkLoadError::new)?;
        self.lines = contents.lines().map(str::to_owned).collect();
        if self.fail {
            return Err(BulkLoadError::new(io::Error::other("store unavailable")));
        }
        u64::try_from(self.lines.len()).map_err(BulkLoadError::new)
    }
}
