//! Lookup command implementation for the geolocation CLI.

use std::{io::Write, net::IpAddr};

use camino::Utf8PathBuf;
use clap::Parser;
use geolocation_core::{Location, LocationRepository};
use geolocation_data::{DEFAULT_DATABASE, SqliteStore, StoreConfig};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, ARG_IP, CliError, ENV_LOOKUP_IP, write_json};

/// CLI arguments for the `lookup` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "lookup", about = "Print the stored location for an IP address")]
#[ortho_config(prefix = "GEOLOCATION")]
pub(crate) struct LookupArgs {
    /// IPv4 or IPv6 address to look up.
    #[arg(value_name = "ip")]
    #[serde(default)]
    pub(crate) ip: Option<String>,
    /// SQLite database file.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl LookupArgs {
    fn into_config(self) -> Result<LookupConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LookupConfig::try_from(merged)
    }
}

/// Resolved `lookup` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupConfig {
    pub(crate) address: IpAddr,
    pub(crate) store: StoreConfig,
}

impl TryFrom<LookupArgs> for LookupConfig {
    type Error = CliError;

    fn try_from(args: LookupArgs) -> Result<Self, Self::Error> {
        let value = args.ip.ok_or(CliError::MissingArgument {
            field: ARG_IP,
            env: ENV_LOOKUP_IP,
        })?;
        let address = value
            .parse()
            .map_err(|source| CliError::InvalidAddress { value, source })?;
        let database = args
            .database
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE));
        Ok(Self {
            address,
            store: StoreConfig::new(database),
        })
    }
}

/// Location as printed by the `lookup` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LocationView {
    pub(crate) id: i64,
    pub(crate) ip_address: IpAddr,
    pub(crate) country_code: String,
    pub(crate) country: String,
    pub(crate) city: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) mystery_value: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Location> for LocationView {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            ip_address: location.ip_address,
            latitude: location.latitude(),
            longitude: location.longitude(),
            country_code: location.country_code,
            country: location.country,
            city: location.city,
            mystery_value: location.auxiliary_value,
            created_at: location.created_at,
            updated_at: location.updated_at,
        }
    }
}

pub(crate) fn run_lookup(args: LookupArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    run_lookup_with(&config, writer)
}

pub(crate) fn run_lookup_with(
    config: &LookupConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    debug!("looking up {} in {}", config.address, config.store.path);
    let store = SqliteStore::connect(&config.store)?;
    store.create_schema()?;
    let location = find_location(&store, config.address)?;
    write_json(writer, &LocationView::from(location))
}

fn find_location(
    repository: &dyn LocationRepository,
    address: IpAddr,
) -> Result<Location, CliError> {
    repository
        .location_by_ip(address)?
        .ok_or(CliError::LocationNotFound { address })
}
