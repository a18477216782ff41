use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading the search interest csv.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("{} ends before the two preamble lines and the header", .path.display())]
    MissingPreamble { path: PathBuf },
    #[error("expected at least 3 columns in the header of {}, found {found}", .path.display())]
    TooFewColumns { path: PathBuf, found: usize },
    #[error("line {line}, column {column}: cannot parse '{text}'")]
    InvalidCell {
        line: usize,
        column: usize,
        text: String,
    },
    #[error("no row with a valid date in {}", .path.display())]
    NoRows { path: PathBuf },
}

/// Failures while drawing or writing the outputs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not draw {}: {message}", .path.display())]
    Draw { path: PathBuf, message: String },
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
}
