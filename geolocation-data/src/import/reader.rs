//! Streams rows from the source file onto the record channel.

use std::io::{self, BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8;
use crossbeam_channel::Sender;
use csv::{ErrorKind, Position, ReaderBuilder, StringRecord};
use geolocation_core::{CSV_HEADER, Record};
use log::{debug, error, warn};

use super::ImportError;
use crate::fs::open_utf8_file;

/// Row counts gathered while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadReport {
    /// Data rows seen, header excluded.
    pub total_rows: u64,
    /// Rows skipped because they were structurally malformed.
    pub malformed_rows: u64,
}

/// An opened source file whose header has been checked.
#[derive(Debug)]
pub struct CsvSource {
    path: Utf8PathBuf,
    reader: csv::Reader<fs_utf8::File>,
    raw: RawSpans,
}

/// Second handle on the source, read in step with the parser.
///
/// The `csv` parser accepts a bare quote inside an unquoted field and closes
/// an open quote at end of input. Each record's raw bytes are checked here
/// so both cases count as malformed.
#[derive(Debug)]
struct RawSpans {
    reader: BufReader<fs_utf8::File>,
    offset: u64,
}

impl RawSpans {
    fn read(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        if start > self.offset {
            io::copy(
                &mut (&mut self.reader).take(start - self.offset),
                &mut io::sink(),
            )?;
            self.offset = start;
        }
        let len = end.saturating_sub(self.offset);
        let mut span = Vec::new();
        (&mut self.reader).take(len).read_to_end(&mut span)?;
        self.offset = self.offset.saturating_add(len);
        Ok(span)
    }
}

impl CsvSource {
    /// Open `path` and check its header against [`CSV_HEADER`].
    ///
    /// No data row is read here, so a header mismatch is reported before
    /// any work is started.
    pub fn open(path: &Utf8Path) -> Result<Self, ImportError> {
        let open = || {
            open_utf8_file(path).map_err(|source| ImportError::OpenSource {
                path: path.to_path_buf(),
                source,
            })
        };
        let file = open()?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(file);

        let found: Vec<String> = match reader.headers() {
            Ok(header) => header.iter().map(str::to_owned).collect(),
            Err(source) if matches!(source.kind(), ErrorKind::Io(_)) => {
                return Err(ImportError::ReadSource {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(_) => Vec::new(),
        };
        if found != CSV_HEADER {
            return Err(ImportError::HeaderMismatch {
                path: path.to_path_buf(),
                found,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            raw: RawSpans {
                reader: BufReader::new(open()?),
                offset: 0,
            },
        })
    }

    /// Path of the opened source.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Publish every well-formed row onto `rows`, then close the channel.
    ///
    /// Malformed rows are logged, counted and skipped. The channel is closed
    /// when `rows` is dropped on return, whether reading succeeded or not.
    pub fn publish(mut self, rows: Sender<Record>) -> Result<ReadReport, ImportError> {
        let mut report = ReadReport::default();
        let mut row = StringRecord::new();

        loop {
            match self.reader.read_record(&mut row) {
                Ok(false) => break,
                Ok(true) => {
                    report.total_rows += 1;
                    if let Some(start) = row.position().map(Position::byte) {
                        let end = self.reader.position().byte();
                        let span = self.raw.read(start, end).map_err(|err| {
                            ImportError::ReadSource {
                                path: self.path.clone(),
                                source: csv::Error::from(err),
                            }
                        })?;
                        if !has_strict_quoting(&span) {
                            report.malformed_rows += 1;
                            warn!("error reading a record: bare or unterminated quote in {row:?}");
                            continue;
                        }
                    }
                    let Some(record) = record_from_row(&row) else {
                        report.malformed_rows += 1;
                        warn!("error reading a record: {row:?}");
                        continue;
                    };
                    if rows.send(record).is_err() {
                        error!("all sanitizer workers stopped; abandoning {}", self.path);
                        break;
                    }
                }
                Err(source) if matches!(source.kind(), ErrorKind::Io(_)) => {
                    return Err(ImportError::ReadSource {
                        path: self.path,
                        source,
                    });
                }
                Err(err) => {
                    report.total_rows += 1;
                    report.malformed_rows += 1;
                    warn!("error reading a record: {err}");
                }
            }
        }

        debug!(
            "finished reading {}: {} rows, {} malformed",
            self.path, report.total_rows, report.malformed_rows
        );
        Ok(report)
    }
}

/// Check a raw record against strict quoting rules.
///
/// A quote may open a field, close it, or be doubled inside a quoted field.
/// Anything else, including a quote still open at the end, fails.
fn has_strict_quoting(raw: &[u8]) -> bool {
    #[derive(Clone, Copy)]
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }

    let mut state = State::FieldStart;
    for &byte in raw {
        state = match (state, byte) {
            (State::Unquoted, b'"') => return false,
            (State::FieldStart, b'"') | (State::QuoteInQuoted, b'"') => State::Quoted,
            (State::FieldStart | State::Unquoted | State::QuoteInQuoted, b',' | b'\r' | b'\n') => {
                State::FieldStart
            }
            (State::FieldStart | State::Unquoted, _) => State::Unquoted,
            (State::Quoted, b'"') => State::QuoteInQuoted,
            (State::Quoted, _) => State::Quoted,
            (State::QuoteInQuoted, _) => return false,
        };
    }
    !matches!(state, State::Quoted)
}

fn record_from_row(row: &StringRecord) -> Option<Record> {
    let fields: Vec<&str> = row.iter().collect();
    let fields: [&str; 7] = fields.try_into().ok()?;
    Some(Record::from_fields(fields))
}
