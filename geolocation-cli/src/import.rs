//! Import command implementation for the geolocation CLI.

use std::{io::Write, num::NonZeroUsize, thread, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use geolocation_core::{ImportSummary, Validator};
use geolocation_data::{DEFAULT_DATABASE, Importer, SqliteStore, StoreConfig};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CONCURRENCY, ARG_CONNECT_RETRIES, ARG_CSV, ARG_DATABASE, ARG_RETRY_INTERVAL_MS,
    ARG_STAGING_DIR, CliError, ENV_IMPORT_CSV, write_json,
};

const DEFAULT_CONNECT_RETRIES: u32 = 3;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "import",
    long_about = "Validate every row of a CSV file, stage the accepted rows \
                 and bulk-load them into the SQLite store. Options can come \
                 from CLI flags, configuration files, or environment \
                 variables.",
    about = "Import a CSV file of geolocation records"
)]
#[ortho_config(prefix = "GEOLOCATION")]
pub(crate) struct ImportArgs {
    /// Path to the CSV source file.
    #[arg(long = ARG_CSV, value_name = "path")]
    #[serde(default)]
    pub(crate) csv: Option<Utf8PathBuf>,
    /// Number of sanitizer threads (defaults to the available CPUs).
    #[arg(long = ARG_CONCURRENCY, value_name = "n")]
    #[serde(default)]
    pub(crate) concurrency: Option<usize>,
    /// SQLite database file.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Directory for the staging file (defaults to the source directory).
    #[arg(long = ARG_STAGING_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) staging_dir: Option<Utf8PathBuf>,
    /// Extra connection attempts after the first failure.
    #[arg(long = ARG_CONNECT_RETRIES, value_name = "n")]
    #[serde(default)]
    pub(crate) connect_retries: Option<u32>,
    /// Pause between connection attempts, in milliseconds.
    #[arg(long = ARG_RETRY_INTERVAL_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) retry_interval_ms: Option<u64>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) csv: Utf8PathBuf,
    pub(crate) concurrency: usize,
    pub(crate) staging_dir: Option<Utf8PathBuf>,
    pub(crate) store: StoreConfig,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let csv = args.csv.ok_or(CliError::MissingArgument {
            field: ARG_CSV,
            env: ENV_IMPORT_CSV,
        })?;
        let concurrency = args.concurrency.unwrap_or_else(default_concurrency);
        let database = args
            .database
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE));
        let store = StoreConfig::new(database).with_retries(
            args.connect_retries.unwrap_or(DEFAULT_CONNECT_RETRIES),
            Duration::from_millis(args.retry_interval_ms.unwrap_or(DEFAULT_RETRY_INTERVAL_MS)),
        );
        Ok(Self {
            csv,
            concurrency,
            staging_dir: args.staging_dir,
            store,
        })
    }
}

fn default_concurrency() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Summary printed once an import completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ImportReport {
    pub(crate) accepted_rows: u64,
    pub(crate) discarded_rows: u64,
    pub(crate) elapsed_seconds: f64,
}

impl From<ImportSummary> for ImportReport {
    fn from(summary: ImportSummary) -> Self {
        Self {
            accepted_rows: summary.accepted_rows,
            discarded_rows: summary.discarded_rows,
            elapsed_seconds: summary.elapsed.as_secs_f64(),
        }
    }
}

pub(crate) fn run_import(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    run_import_with(&config, writer)
}

pub(crate) fn run_import_with(
    config: &ImportConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let summary = execute_import(config)?;
    write_json(writer, &ImportReport::from(summary))
}

fn execute_import(config: &ImportConfig) -> Result<ImportSummary, CliError> {
    debug!("resolved import configuration: {config:?}");
    let store = SqliteStore::connect(&config.store)?;
    store.create_schema()?;
    let mut importer = Importer::new(store, Validator::standard()?);
    if let Some(dir) = &config.staging_dir {
        importer = importer.with_staging_dir(dir.clone());
    }
    Ok(importer.import_csv(&config.csv, config.concurrency)?)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}
