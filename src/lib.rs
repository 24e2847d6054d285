//! Facade crate for the geolocation importer.
//!
//! This crate re-exports the core domain types, the concurrent CSV import
//! pipeline and the SQLite store.

#![forbid(unsafe_code)]

pub use geolocation_core::{
    BulkLoadError, BulkLoader, CSV_HEADER, Field, ImportSummary, InvalidRule, Location,
    LocationRepository, Record, RejectReason, RepositoryError, ValidationError, Validator,
    ValidatorRules,
};

pub use geolocation_data::{
    DEFAULT_DATABASE, ImportError, Importer, SanitizeReport, SqliteStore, SqliteStoreError,
    StoreConfig, import,
};
