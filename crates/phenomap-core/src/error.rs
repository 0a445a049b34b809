use std::path::PathBuf;

use thiserror::Error;

/// Every failure the core can report.
#[derive(Error, Debug)]
pub enum PhenoError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{}: required column `{column}` not found in header", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(
        "grid {index} has {}x{} cells, expected {}x{} (rows x cols)",
        found.0, found.1, expected.0, expected.1
    )]
    DimensionMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("data integrity: {0}")]
    DataIntegrity(String),
    #[error("paired threshold mode needs an even number of grids, got {0}")]
    OddPairCount(usize),
    #[error("run cancelled")]
    Cancelled,
}

impl PhenoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse { path: path.into(), line, message: message.into() }
    }
}

/// Convenience type for `Result<T, PhenoError>`.
pub type Result<T> = std::result::Result<T, PhenoError>;
