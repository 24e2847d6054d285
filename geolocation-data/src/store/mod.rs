//! SQLite persistence for imported locations.
#![forbid(unsafe_code)]

use std::{
    net::{AddrParseError, IpAddr},
    path::{Path, PathBuf},
    thread,
};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord};
use geo::Coord;
use geolocation_core::{
    BulkLoadError, BulkLoader, Location, LocationRepository, RepositoryError,
};
use log::{debug, info, warn};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Row, types::Type};
use thiserror::Error;

use crate::fs::{ensure_parent_dir, open_utf8_file};

mod config;
mod schema;

pub use config::{DEFAULT_DATABASE, StoreConfig};

/// Errors raised by [`SqliteStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteStoreError {
    /// Failed to create the parent directory for the database file.
    #[error("failed to create parent directory for {path}")]
    CreateDirectory {
        /// Database path being prepared.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Applying connection settings failed.
    #[error("failed to configure SQLite connection")]
    Configure {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database opened but its schema table could not be read.
    #[error("SQLite database at {path} did not respond")]
    Probe {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `locations` table failed.
    #[error("failed to create locations table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The staging path is not valid UTF-8.
    #[error("staging path {path:?} is not valid UTF-8")]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
    /// The staging file could not be opened.
    #[error("failed to open staging file {path}")]
    OpenStaging {
        /// Staging file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Reading the staging file failed.
    #[error("failed to read staging file {path}")]
    ReadStaging {
        /// Staging file path.
        path: Utf8PathBuf,
        /// Error reported by the CSV reader.
        #[source]
        source: csv::Error,
    },
    /// Beginning the load transaction failed.
    #[error("failed to begin load transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing the insert statement failed.
    #[error("failed to prepare location insert statement")]
    PrepareInsert {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing a row failed.
    #[error("failed to persist staging line {line}")]
    PersistRow {
        /// One-based line number in the staging file.
        line: u64,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the load transaction failed.
    #[error("failed to commit load transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Querying stored locations failed.
    #[error("failed to query locations")]
    Query {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// A SQLite-backed location store.
///
/// Implements [`BulkLoader`] for the import pipeline and
/// [`LocationRepository`] for lookups.
#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
    path: Utf8PathBuf,
}

impl SqliteStore {
    /// Open the database described by `config`, retrying on failure.
    ///
    /// Each attempt opens the file and probes it by reading the schema
    /// table. After `connect_retries` further failures the last error is
    /// returned.
    pub fn connect(config: &StoreConfig) -> Result<Self, SqliteStoreError> {
        ensure_parent_dir(&config.path).map_err(|source| SqliteStoreError::CreateDirectory {
            path: config.path.clone(),
            source,
        })?;

        let attempts = config.connect_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match open_and_probe(config) {
                Ok(connection) => {
                    info!("connected to SQLite database at {}", config.path);
                    return Ok(Self {
                        connection,
                        path: config.path.clone(),
                    });
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        "failed to connect to {} (attempt {attempt}/{attempts}): {err}",
                        config.path
                    );
                    thread::sleep(config.retry_interval);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Database file this store is bound to.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Create the `locations` table if it does not exist.
    pub fn create_schema(&self) -> Result<(), SqliteStoreError> {
        self.connection
            .execute(schema::CREATE_LOCATIONS, [])
            .map(|_| ())
            .map_err(|source| SqliteStoreError::CreateSchema { source })
    }

    /// Insert every row of a staging file in one transaction.
    ///
    /// Rows the table refuses, such as a repeated address, are ignored, as
    /// are rows whose numeric columns cannot be parsed. Returns the number
    /// of rows inserted.
    pub fn load_staging(&mut self, staging: &Utf8Path) -> Result<u64, SqliteStoreError> {
        let file = open_utf8_file(staging).map_err(|source| SqliteStoreError::OpenStaging {
            path: staging.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let transaction = self
            .connection
            .transaction()
            .map_err(|source| SqliteStoreError::BeginTransaction { source })?;
        let mut inserted: usize = 0;
        let mut line: u64 = 0;
        {
            let mut statement = transaction
                .prepare(schema::INSERT_LOCATION)
                .map_err(|source| SqliteStoreError::PrepareInsert { source })?;
            let mut row = StringRecord::new();
            while reader
                .read_record(&mut row)
                .map_err(|source| SqliteStoreError::ReadStaging {
                    path: staging.to_path_buf(),
                    source,
                })?
            {
                line += 1;
                let Some(staged) = StagedRow::parse(&row) else {
                    warn!("skipping unloadable staging line {line}: {row:?}");
                    continue;
                };
                inserted += statement
                    .execute((
                        staged.address.to_string(),
                        staged.country_code,
                        staged.country,
                        staged.city,
                        staged.position.y,
                        staged.position.x,
                        staged.auxiliary_value,
                    ))
                    .map_err(|source| SqliteStoreError::PersistRow { line, source })?;
            }
        }
        transaction
            .commit()
            .map_err(|source| SqliteStoreError::Commit { source })?;

        debug!("loaded {inserted} of {line} staged rows into {}", self.path);
        Ok(u64::try_from(inserted).unwrap_or(u64::MAX))
    }

    /// Fetch the location stored for `address`.
    pub fn find_by_ip(&self, address: IpAddr) -> Result<Option<Location>, SqliteStoreError> {
        self.connection
            .query_row(schema::SELECT_BY_IP, [address.to_string()], location_from_row)
            .optional()
            .map_err(|source| SqliteStoreError::Query { source })
    }
}

impl BulkLoader for SqliteStore {
    fn load(&mut self, staging: &Path) -> Result<u64, BulkLoadError> {
        let staging = Utf8Path::from_path(staging).ok_or_else(|| {
            BulkLoadError::new(SqliteStoreError::NonUtf8Path {
                path: staging.to_path_buf(),
            })
        })?;
        self.load_staging(staging).map_err(BulkLoadError::new)
    }
}

impl LocationRepository for SqliteStore {
    fn location_by_ip(&self, address: IpAddr) -> Result<Option<Location>, RepositoryError> {
        self.find_by_ip(address).map_err(RepositoryError::new)
    }
}

fn open_and_probe(config: &StoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open(config.path.as_std_path()).map_err(|source| {
        SqliteStoreError::Open {
            path: config.path.clone(),
            source,
        }
    })?;
    connection
        .busy_timeout(config.busy_timeout)
        .map_err(|source| SqliteStoreError::Configure { source })?;
    connection
        .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|source| SqliteStoreError::Probe {
            path: config.path.clone(),
            source,
        })?;
    Ok(connection)
}

/// A staging line converted to column types.
struct StagedRow {
    address: IpAddr,
    country_code: String,
    country: String,
    city: String,
    position: Coord<f64>,
    auxiliary_value: i64,
}

impl StagedRow {
    fn parse(row: &StringRecord) -> Option<Self> {
        let [address, country_code, country, city, latitude, longitude, auxiliary] =
            <[&str; 7]>::try_from(row.iter().collect::<Vec<_>>()).ok()?;
        Some(Self {
            address: address.parse().ok()?,
            country_code: country_code.to_owned(),
            country: country.to_owned(),
            city: city.to_owned(),
            position: Coord {
                x: longitude.parse().ok()?,
                y: latitude.parse().ok()?,
            },
            auxiliary_value: auxiliary.parse().ok()?,
        })
    }
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    let address: String = row.get(1)?;
    let ip_address = address
        .parse()
        .map_err(|err: AddrParseError| {
            SqliteError::FromSqlConversionFailure(1, Type::Text, Box::new(err))
        })?;
    Ok(Location {
        id: row.get(0)?,
        ip_address,
        country_code: row.get(2)?,
        country: row.get(3)?,
        city: row.get(4)?,
        position: Coord {
            x: row.get(6)?,
            y: row.get(5)?,
        },
        auxiliary_value: row.get(7)?,
        created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}
