//! Common utilities for Kunai.
//!
//! This crate provides the low-level building blocks shared by the other Kunai crates:
//!
//! - [`BinaryReader`] - Bounds-checked cursor over a byte slice
//! - [`field`] - Checked little-endian reads at fixed offsets
//! - [`align`] - Padding arithmetic used by every serializer

mod error;
mod reader;

pub mod align;
pub mod field;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Re-export byteorder so crates patch fields with the same byte order.
pub use byteorder::{ByteOrder, LittleEndian};
