//! Storage capabilities used by the import pipeline and lookups.
//!
//! The importer hands a finished staging file to a [`BulkLoader`]; queries
//! go through a [`LocationRepository`]. Concrete stores live in
//! `geolocation-data`.

use std::{error::Error as StdError, net::IpAddr, path::Path};

use thiserror::Error;

use crate::Location;

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure raised by a [`BulkLoader`].
#[derive(Debug, Error)]
#[error("bulk load failed")]
pub struct BulkLoadError(#[source] pub BoxedError);

impl BulkLoadError {
    /// Wrap a store-specific error.
    pub fn new(source: impl Into<BoxedError>) -> Self {
        Self(source.into())
    }
}

/// Failure raised by a [`LocationRepository`].
#[derive(Debug, Error)]
#[error("location lookup failed")]
pub struct RepositoryError(#[source] pub BoxedError);

impl RepositoryError {
    /// Wrap a store-specific error.
    pub fn new(source: impl Into<BoxedError>) -> Self {
        Self(source.into())
    }
}

/// Ingest a staging file of sanitized rows.
///
/// The file holds comma-separated rows with no header, one record per line,
/// in the column order of [`crate::CSV_HEADER`].
pub trait BulkLoader {
    /// Load every row from `staging`, returning how many were inserted.
    ///
    /// Rows the store refuses (duplicates, values it cannot store) are not
    /// counted and do not fail the load.
    fn load(&mut self, staging: &Path) -> Result<u64, BulkLoadError>;
}

impl<T: BulkLoader + ?Sized> BulkLoader for &mut T {
    fn load(&mut self, staging: &Path) -> Result<u64, BulkLoadError> {
        (**self).load(staging)
    }
}

/// Read access to stored locations.
pub trait LocationRepository {
    /// Fetch the location stored for `address`, if any.
    fn location_by_ip(&self, address: IpAddr) -> Result<Option<Location>, RepositoryError>;
}
