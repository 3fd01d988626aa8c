use std::path::PathBuf;
use thiserror::Error;

/// All the ways a run can fail.
/// Every variant is fatal: the apps print it and exit before any output file is written.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("invalid arguments: {0}")]
    ArgumentCount(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("could not parse the start datetime from file name {name:?}: {reason}")]
    FilenameFormat { name: String, reason: String },
    #[error("malformed hexadecimal token {token:?} at line {line}")]
    MalformedHex { line: usize, token: String },
    #[error("no records starting with {0:?} found")]
    NoRecordsFound(&'static str),
    #[error("record at line {line} has {found} fields, expected {expected}")]
    InconsistentRowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("record at line {line} has {found} fields, at least 2 are required")]
    EmptyRecord { line: usize, found: usize },
    #[error("invalid window size {0}, it must be a positive integer")]
    InvalidWindowSize(String),
    #[error("time axis overflows after {0} minutes")]
    TimeOverflow(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write {}: no such directory", .0.display())]
    OutputPath(PathBuf),
    #[error("could not draw chart: {0}")]
    Plot(String),
}
