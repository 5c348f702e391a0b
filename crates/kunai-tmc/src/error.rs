//! Error types for the TMC crate.

use kunai_container::FormatError;
use thiserror::Error;

use crate::SectionKind;

/// Errors that can occur when parsing or committing a model.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] kunai_common::Error),

    /// Container framing error.
    #[error("{0}")]
    Format(#[from] FormatError),

    /// A record is shorter than its fixed layout requires.
    #[error("{what} record too short: need {needed} bytes, have {available}")]
    RecordTooShort {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A required top-level section is absent.
    #[error("missing {0} section")]
    MissingSection(SectionKind),

    /// A section produced companion data but `LHeader` has no record for it.
    #[error("LHeader has no companion record for {0}")]
    MissingCompanionSlot(SectionKind),

    /// A stored index points outside the list it refers to.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },
}

/// Result type for TMC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::RecordTooShort`] unless `data` holds `needed` bytes.
pub(crate) fn ensure_len(what: &'static str, data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(Error::RecordTooShort {
            what,
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

/// Fail with [`Error::IndexOutOfRange`] unless `index` is a valid position in a list of `len`.
pub(crate) fn ensure_index(what: &'static str, index: i64, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(Error::IndexOutOfRange { what, index, len })
}
