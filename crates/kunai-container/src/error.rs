//! Error types for the container codec.

use thiserror::Error;

use crate::Magic;

/// Errors raised while parsing a container.
///
/// These always reach the caller: they mean the asset is corrupt or the
/// primary and companion buffers do not belong together.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The buffer starts with a different tag than the one requested.
    #[error("bad magic: expected {expected}, got {actual}")]
    BadMagic { expected: Magic, actual: Magic },

    /// The version bytes at 0x08 are not the supported constant.
    #[error("unsupported container version {0:02x?}")]
    UnsupportedVersion([u8; 4]),

    /// The header size is neither the inline nor the companion size.
    #[error("{magic}: invalid header size {size:#x}")]
    InvalidHeaderSize { magic: Magic, size: u32 },

    /// The header declares companion layout but no companion buffer was given.
    #[error("{0}: records live in a companion buffer but none was supplied")]
    MissingCompanionBuffer(Magic),

    /// The redundant header in the primary and companion buffers disagree.
    #[error("{magic}: {field} differs between primary ({primary:#x}) and companion ({companion:#x}) headers")]
    HeaderMismatch {
        magic: Magic,
        field: &'static str,
        primary: u32,
        companion: u32,
    },

    /// A declared size, table or record span runs past the end of its buffer.
    #[error("{magic}: {what} needs {needed} bytes but the buffer holds {available}")]
    TruncatedBuffer {
        magic: Magic,
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// Common library error.
    #[error("{0}")]
    Common(#[from] kunai_common::Error),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, FormatError>;
