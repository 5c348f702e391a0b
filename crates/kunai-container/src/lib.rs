//! Codec for the framed "container" format used by TMC model assets.
//!
//! A container is a small header followed by an optional metadata blob, an
//! offset table, an optional size table, an optional nested sub-container and
//! a list of variable-length records. Containers nest: records, metadata and
//! sub-containers of one container are frequently containers themselves.
//!
//! # Layouts
//!
//! - **Inline** (`header_size == 0x30`): record bodies follow the tables in the
//!   primary buffer.
//! - **Companion** (`header_size == 0x50`): the primary buffer carries only the
//!   header, metadata, tables and sub-container. Record bodies live in a
//!   separate companion buffer (the "L-buffer") that starts with a 16-byte
//!   header duplicated at offset 0x40 of the primary buffer.
//!
//! # Byte stability
//!
//! [`Container::options`] captures every layout choice observed while parsing,
//! so an unmodified container re-encodes to exactly the bytes it was parsed
//! from. Sibling tables elsewhere in a model store absolute offsets into these
//! buffers and rely on this.
//!
//! # Example
//!
//! ```no_run
//! use kunai_container::{Container, ContainerParts, Magic, SerializeOptions};
//!
//! let mut parts = ContainerParts::new(Magic::new(b"HieLay"));
//! parts.records.push(vec![0u8; 0x60]);
//! let encoded = parts.encode();
//!
//! let container = Container::parse(Magic::new(b"HieLay"), &encoded.data, None)?;
//! assert_eq!(container.records().len(), 1);
//! assert_eq!(container.reencode(), encoded);
//! # Ok::<(), kunai_container::FormatError>(())
//! ```

mod container;
mod error;
mod header;
mod parts;
mod writer;

pub use container::Container;
pub use error::{FormatError, Result};
pub use header::{
    CompanionHeader, ContainerHeader, Magic, CHECK_CONSTANT, COMPANION_HEADER_SIZE,
    COMPANION_PREFIX_SIZE, HEADER_SIZE, VERSION_BYTES,
};
pub use parts::ContainerParts;
pub use writer::{serialize, Encoded, SerializeOptions, SizeTable, DEFAULT_ALIGNMENT};
