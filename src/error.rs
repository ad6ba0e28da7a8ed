use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Timestamp parse error: {0}")]
    TimeParse(#[from] chrono::ParseError),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not a supported archive: {}", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error("No .{suffix} members found in {}", .archive.display())]
    EmptyArchive { archive: PathBuf, suffix: String },

    #[error("Storage error at {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Failed to download and process: {}", .0.join(", "))]
    Aggregate(Vec<String>),
}

impl HarvestError {
    /// Wrap a lower-level error with the partition or watermark path it hit.
    pub fn storage(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        HarvestError::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
