use thiserror::Error;

/// Errors raised while reading, editing or writing a container
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a group: {0}")]
    NotAGroup(String),
}
