//! Error types emitted by the geolocation CLI.

use std::{
    net::{AddrParseError, IpAddr},
    sync::Arc,
};

use geolocation_core::{InvalidRule, RepositoryError};
use geolocation_data::{ImportError, SqliteStoreError};
use thiserror::Error;

/// Errors emitted by the geolocation CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The lookup argument is not an IP address.
    #[error("{value:?} is not a valid IP address")]
    InvalidAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },
    /// The built-in validation rules failed to compile.
    #[error(transparent)]
    ValidatorRules(#[from] InvalidRule),
    /// Connecting to or preparing the store failed.
    #[error("store error: {0}")]
    Store(#[from] SqliteStoreError),
    /// The import aborted.
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    /// Querying the store failed.
    #[error(transparent)]
    Lookup(#[from] RepositoryError),
    /// No location is stored for the requested address.
    #[error("no location stored for {address}")]
    LocationNotFound { address: IpAddr },
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
