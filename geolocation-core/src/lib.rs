//! Core domain types for the geolocation importer.
//!
//! These models keep raw input as text until the [`Validator`] has checked
//! it, so rejections can always report the original offending value. The
//! storage capabilities ([`BulkLoader`] and [`LocationRepository`]) are
//! declared here so the import pipeline never depends on a concrete store.

use std::time::Duration;

mod location;
mod record;
pub mod store;
mod validator;

pub use location::Location;
pub use record::{Field, Record};
pub use store::{BulkLoadError, BulkLoader, LocationRepository, RepositoryError};
pub use validator::{InvalidRule, RejectReason, ValidationError, Validator, ValidatorRules};

/// Column names expected on the first line of every import file.
pub const CSV_HEADER: [&str; 7] = [
    "address",
    "country_code",
    "country",
    "city",
    "latitude",
    "longitude",
    "auxiliary_value",
];

/// Outcome of a completed import.
///
/// `accepted_rows + discarded_rows` always equals the number of data rows
/// read from the source (header excluded).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use geolocation_core::ImportSummary;
///
/// let summary = ImportSummary::from_counts(10, 7, Duration::from_millis(5));
/// assert_eq!(summary.discarded_rows, 3);
/// assert_eq!(summary.total_rows(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportSummary {
    /// Rows the store reported as inserted.
    pub accepted_rows: u64,
    /// Rows dropped anywhere in the pipeline: malformed, rejected by the
    /// validator, or refused by the store.
    pub discarded_rows: u64,
    /// Wall-clock time spent on the whole import.
    pub elapsed: Duration,
}

impl ImportSummary {
    /// Build a summary from the rows read and the rows the store accepted.
    ///
    /// A store can never accept more rows than were read; should it claim to,
    /// the accepted count is clamped so the sum invariant still holds.
    #[must_use]
    pub fn from_counts(total_rows: u64, inserted_rows: u64, elapsed: Duration) -> Self {
        let accepted_rows = inserted_rows.min(total_rows);
        Self {
            accepted_rows,
            discarded_rows: total_rows - accepted_rows,
            elapsed,
        }
    }

    /// Number of data rows the import read.
    #[must_use]
    pub const fn total_rows(&self) -> u64 {
        self.accepted_rows + self.discarded_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3, 2, 1)]
    #[case(0, 0, 0)]
    #[case(5, 5, 0)]
    fn summary_counts_add_up(#[case] total: u64, #[case] inserted: u64, #[case] discarded: u64) {
        let summary = ImportSummary::from_counts(total, inserted, Duration::ZERO);
        assert_eq!(summary.accepted_rows, inserted);
        assert_eq!(summary.discarded_rows, discarded);
        assert_eq!(summary.total_rows(), total);
    }

    #[rstest]
    fn summary_clamps_overreported_inserts() {
        let summary = ImportSummary::from_counts(2, 9, Duration::ZERO);
        assert_eq!(summary.accepted_rows, 2);
        assert_eq!(summary.discarded_rows, 0);
    }
}
