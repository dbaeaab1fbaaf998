use thiserror::Error;

use crate::container::ContainerError;
use crate::repack::RepackError;
use crate::transform::TransformError;

/// Errors that stop a whole invocation
#[derive(Debug, Error)]
pub enum ShrinkError {
    #[error("User cancelled")]
    Cancelled,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

/// Errors that fail a single file; the batch carries on with the next one
#[derive(Debug, Error)]
pub enum FileError {
    #[error("interrupted")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Repack error: {0}")]
    Repack(#[from] RepackError),
}
