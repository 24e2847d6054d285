//! Import pipeline and SQLite storage for the geolocation importer.
//!
//! Responsibilities:
//! - Stream CSV sources through the concurrent sanitization pipeline.
//! - Persist staged rows to SQLite and serve lookups from it.
//!
//! Boundaries:
//! - Validation rules live in `geolocation-core`.
//! - The pipeline only depends on the `BulkLoader` capability, never on a
//!   concrete store.
//!
//! Invariants:
//! - No global mutable state. Each import owns its channels and staging
//!   file for its whole lifetime.

mod fs;
pub mod import;
pub mod store;

pub use import::{ImportError, Importer, SanitizeReport};
pub use store::{DEFAULT_DATABASE, SqliteStore, SqliteStoreError, StoreConfig};
