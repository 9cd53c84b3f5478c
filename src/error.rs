use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Errors that abort a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input directory does not exist: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("action log not found: {}", .0.display())]
    ActionLogNotFound(PathBuf),

    #[error("failed to read action log {}: {source}", .path.display())]
    ReadActionLog {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error("failed to write dataset {}: {source}", .path.display())]
    WriteDataset {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("failed to read dataset {}: {source}", .path.display())]
    ReadDataset {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("got {images} image outcomes for {rows} action log rows")]
    ImageCountMismatch { rows: usize, images: usize },

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors for a single frame. These never abort a run; the row's image
/// becomes null instead.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("row {row} has no usable frame index")]
    InvalidFrameIndex { row: usize },

    #[error("action log has no `frame` column")]
    NoFrameColumn,
}
