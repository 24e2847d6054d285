//! Command-line interface for importing and querying geolocation data.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod error;
mod import;
mod lookup;

pub use error::CliError;

use import::ImportArgs;
use lookup::LookupArgs;

const ARG_CSV: &str = "csv";
const ARG_CONCURRENCY: &str = "concurrency";
const ARG_DATABASE: &str = "database";
const ARG_STAGING_DIR: &str = "staging-dir";
const ARG_CONNECT_RETRIES: &str = "connect-retries";
const ARG_RETRY_INTERVAL_MS: &str = "retry-interval-ms";
const ARG_IP: &str = "ip";
const ENV_IMPORT_CSV: &str = "GEOLOCATION_CMDS_IMPORT_CSV";
const ENV_LOOKUP_IP: &str = "GEOLOCATION_CMDS_LOOKUP_IP";

/// Run the geolocation CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Import(args) => import::run_import(args, &mut stdout),
        Command::Lookup(args) => lookup::run_lookup(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "geolocation",
    about = "Import and query IP geolocation records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sanitize a CSV file and bulk-load it into the store.
    Import(ImportArgs),
    /// Print the stored location for an IP address.
    Lookup(LookupArgs),
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
