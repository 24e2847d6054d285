//! Unit tests covering import configuration and execution.

use super::*;
use crate::import::{
    ImportArgs, ImportConfig, ImportReport, config_from_layers_for_test, run_import_with,
};
use camino::Utf8PathBuf;
use geolocation_data::StoreConfig;
use rstest::{fixture, rstest};
use std::{fs, time::Duration};
use tempfile::TempDir;

const SOURCE: &str = "address,country_code,country,city,latitude,longitude,auxiliary_value\n\
                      200.106.141.15,SI,Nepal,DuBuquemouth,-84.87503094689836,7.206435933364332,7823011346\n\
                      160.103.7.140,CZ,Nicaragua,New Neva,-68.31023296602508,-37.62435199624531,7301823115\n\
                      160.103.7.140,CZ,Nicaragua,New Neva,-68.31023296602508,-37.62435199624531,7301823115\n\
                      70.95.73.73,TL,Saudi Arabia,Gradymouth,-49.16675918861615,-86.05920084416894\n\
                      125.159.20.54,LI,Guyana,Port Karson,-78.2274228596799,-163.26218895343357,1337885276\n\
                      1.1.1,LI,Guyana,Port Karson,-78.2274228596799,-163.26218895343357,1337885276\n";

#[fixture]
fn workspace() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn root(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace")
}

#[rstest]
fn converting_without_csv_errors() {
    let err = ImportConfig::try_from(ImportArgs::default()).expect_err("csv is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_CSV);
            assert_eq!(env, ENV_IMPORT_CSV);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn conversion_applies_defaults() {
    let args = ImportArgs {
        csv: Some(Utf8PathBuf::from("data.csv")),
        ..ImportArgs::default()
    };
    let config = ImportConfig::try_from(args).expect("config builds");
    assert_eq!(config.csv, "data.csv");
    assert!(config.concurrency >= 1);
    assert_eq!(config.staging_dir, None);
    assert_eq!(config.store.path, "geolocation.db");
    assert_eq!(config.store.connect_retries, 3);
    assert_eq!(config.store.retry_interval, Duration::from_secs(1));
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "csv": "from-file.csv",
            "database": "from-file.db",
            "concurrency": 2,
        }),
        None,
    );
    composer.push_environment(json!({
        "csv": "from-env.csv",
        "connect_retries": 9,
    }));
    composer.push_cli(json!({
        "concurrency": 6,
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.csv, "from-env.csv");
    assert_eq!(config.concurrency, 6);
    assert_eq!(config.store.path, "from-file.db");
    assert_eq!(config.store.connect_retries, 9);
}

#[rstest]
fn invalid_layer_maps_to_configuration_error() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "concurrency": "many" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn import_prints_summary_and_persists_rows(workspace: TempDir) {
    let root = root(&workspace);
    let csv = root.join("locations.csv");
    fs::write(&csv, SOURCE).expect("write source");
    let config = ImportConfig {
        csv,
        concurrency: 3,
        staging_dir: None,
        store: StoreConfig::new(root.join("geo.db")).with_retries(0, Duration::ZERO),
    };
    let mut output = Vec::new();

    run_import_with(&config, &mut output).expect("import succeeds");

    let report: ImportReport = serde_json::from_slice(&output).expect("summary is JSON");
    assert_eq!(report.accepted_rows, 3);
    assert_eq!(report.discarded_rows, 3);
    assert!(report.elapsed_seconds >= 0.0);
    assert!(!root.join("locations_sanitized.csv").exists());
}

#[rstest]
fn import_reports_header_mismatch(workspace: TempDir) {
    let root = root(&workspace);
    let csv = root.join("bad.csv");
    fs::write(&csv, "ip_address,country_code\n").expect("write source");
    let config = ImportConfig {
        csv,
        concurrency: 1,
        staging_dir: None,
        store: StoreConfig::new(root.join("geo.db")).with_retries(0, Duration::ZERO),
    };

    let err = run_import_with(&config, &mut Vec::new()).expect_err("header is wrong");

    match err {
        CliError::Import(geolocation_data::ImportError::HeaderMismatch { .. }) => {}
        other => panic!("expected header mismatch, found {other:?}"),
    }
}
