//! Error types for the databin crate.

use thiserror::Error;

/// Errors that can occur when working with databin archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] kunai_common::Error),

    /// Header or directory fields are inconsistent with the file.
    #[error("invalid databin header: {0}")]
    InvalidHeader(String),

    /// No chunk carries the requested id.
    #[error("chunk not found: {0}")]
    ChunkNotFound(u32),

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),
}

/// Result type for databin operations.
pub type Result<T> = std::result::Result<T, Error>;
