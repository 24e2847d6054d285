//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = geolocation_cli::run() {
        eprintln!("geolocation: {err}");
        std::process::exit(1);
    }
}
