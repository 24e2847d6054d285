//! Unit tests for the import pipeline.

use super::*;
use geolocation_core::BulkLoadError;
use rstest::{fixture, rstest};
use std::{fs, io, path::Path};
use tempfile::TempDir;

const HEADER: &str = "address,country_code,country,city,latitude,longitude,auxiliary_value";

/// Counts staging lines and reports them all as inserted.
#[derive(Debug, Default)]
struct LineCountingLoader {
    lines: Vec<String>,
    calls: usize,
    fail: bool,
}

impl BulkLoader for LineCountingLoader {
    fn load(&mut self, staging: &Path) -> Result<u64, BulkLoadError> {
        self.calls += 1;
        let contents = fs::read_to_string(staging).map_err(BulkLoadError::new)?;
        self.lines = contents.lines().map(str::to_owned).collect();
        if self.fail {
            return Err(BulkLoadError::new(io::Error::other("store unavailable")));
        }
        Ok(self.lines.len() as u64)
    }
}

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn importer(loader: LineCountingLoader) -> Importer<LineCountingLoader> {
    Importer::new(loader, Validator::standard().expect("default rules compile"))
}

fn write_source(dir: &TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 path");
    fs::write(&path, contents).expect("write source");
    path
}

fn mixed_source() -> String {
    format!(
        "{HEADER}\n\
         200.106.141.15,SI,Nepal,DuBuquemouth,-84.87503094689836,7.206435933364332,7823011346\n\
         160.103.7.140,CZ,Nicaragua,New Neva,-68.31023296602508,-37.62435199624531,7301823115\n\
         70.95.73.73,TL,Saudi Arabia,Gradymouth,-49.16675918861615,-86.05920084416894\n"
    )
}

#[rstest]
fn imports_valid_rows_and_counts_malformed(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let mut importer = importer(LineCountingLoader::default());

    let summary = importer.import_csv(&path, 2).expect("import succeeds");

    assert_eq!(summary.accepted_rows, 2);
    assert_eq!(summary.discarded_rows, 1);
    assert_eq!(summary.total_rows(), 3);
    assert_eq!(importer.loader().lines.len(), 2);
}

#[rstest]
fn removes_staging_file_after_load(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let mut importer = importer(LineCountingLoader::default());

    importer.import_csv(&path, 1).expect("import succeeds");

    assert!(!staging_path_for(&path, None).exists());
}

#[rstest]
fn removes_staging_file_when_load_fails(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let mut importer = importer(LineCountingLoader {
        fail: true,
        ..LineCountingLoader::default()
    });

    let err = importer.import_csv(&path, 1).expect_err("load fails");

    assert!(matches!(err, ImportError::Load { .. }), "{err:?}");
    assert!(!staging_path_for(&path, None).exists());
    assert_eq!(importer.loader().calls, 1);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(8)]
fn concurrency_does_not_change_counts(temp_dir: TempDir, #[case] concurrency: usize) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let mut importer = importer(LineCountingLoader::default());

    let summary = importer.import_csv(&path, concurrency).expect("import succeeds");

    assert_eq!((summary.accepted_rows, summary.discarded_rows), (2, 1));
}

#[rstest]
#[case("data.txt")]
#[case("data")]
#[case("data.CSV")]
fn rejects_other_extensions_without_io(#[case] name: &str) {
    let mut importer = importer(LineCountingLoader::default());
    let err = importer
        .import_csv(Utf8Path::new(name), 1)
        .expect_err("extension is rejected");
    assert!(matches!(err, ImportError::UnsupportedExtension { .. }), "{err:?}");
}

#[rstest]
fn header_mismatch_leaves_no_staging_file(temp_dir: TempDir) {
    let path = write_source(
        &temp_dir,
        "bad.csv",
        "ip_address,country_code,country,city,latitude,longitude,mystery_value\n",
    );
    let mut importer = importer(LineCountingLoader::default());

    let err = importer.import_csv(&path, 2).expect_err("header is rejected");

    assert!(matches!(err, ImportError::HeaderMismatch { .. }), "{err:?}");
    assert!(!staging_path_for(&path, None).exists());
    assert_eq!(importer.loader().calls, 0);
}

#[rstest]
fn stages_into_configured_directory(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let stage_dir =
        Utf8PathBuf::from_path_buf(temp_dir.path().join("staging")).expect("utf-8 path");
    let mut importer =
        importer(LineCountingLoader::default()).with_staging_dir(stage_dir.clone());

    importer.import_csv(&path, 1).expect("import succeeds");

    assert!(stage_dir.is_dir(), "staging directory should be created");
    assert!(!stage_dir.join("mixed_sanitized.csv").exists());
}

#[rstest]
fn staging_creation_failure_stops_before_loading(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let not_a_dir = write_source(&temp_dir, "occupied", "");
    let mut importer =
        importer(LineCountingLoader::default()).with_staging_dir(not_a_dir.clone());

    let err = importer.import_csv(&path, 2).expect_err("staging cannot be created");

    match err {
        ImportError::CreateStaging { path: staging, .. } => {
            assert_eq!(staging, not_a_dir.join("mixed_sanitized.csv"));
        }
        other => panic!("expected CreateStaging, got {other:?}"),
    }
    assert_eq!(importer.loader().calls, 0);
}

#[cfg(target_os = "linux")]
#[rstest]
fn write_failure_discards_staging_file(temp_dir: TempDir) {
    let path = write_source(&temp_dir, "mixed.csv", &mixed_source());
    let staging = staging_path_for(&path, None);
    fs::write(&staging, "").expect("create staging file");
    // Every write to /dev/full fails with ENOSPC.
    let full = create_utf8_file(Utf8Path::new("/dev/full")).expect("open /dev/full");
    let source = CsvSource::open(&path).expect("header matches");
    let mut importer = importer(LineCountingLoader::default());

    let err = importer
        .stage_and_load(source, full, &staging, 2)
        .expect_err("staging writes fail");

    assert!(matches!(err, ImportError::FlushStaging { .. }), "{err:?}");
    assert!(!staging.exists(), "{staging} should have been removed");
    assert_eq!(importer.loader().calls, 0);
}

#[rstest]
fn rejected_rows_are_discarded(temp_dir: TempDir) {
    let path = write_source(
        &temp_dir,
        "rejects.csv",
        &format!(
            "{HEADER}\n\
             127.0.0,AC,Test,Test,1,2,3\n\
             127.0.0.1,ac,Test,Test,1,2,3\n\
             127.0.0.2,AC,Test,Test,1,2,3\n\
             127.0.0.3,AC,Test,O'Hara,1,2,3\n"
        ),
    );
    let mut importer = importer(LineCountingLoader::default());

    let summary = importer.import_csv(&path, 3).expect("import succeeds");

    assert_eq!((summary.accepted_rows, summary.discarded_rows), (2, 2));
    let mut lines = importer.into_loader().lines;
    lines.sort();
    assert_eq!(
        lines,
        [
            "127.0.0.2,AC,Test,Test,1,2,3",
            "127.0.0.3,AC,Test,'O'Hara',1,2,3"
        ]
    );
}

#[rstest]
fn report_display_lists_every_stage() {
    let report = SanitizeReport {
        total_rows: 4,
        malformed_rows: 1,
        rejected_rows: 1,
        staged_rows: 2,
    };
    assert_eq!(
        report.to_string(),
        "4 rows read, 1 malformed, 1 rejected, 2 staged"
    );
}
