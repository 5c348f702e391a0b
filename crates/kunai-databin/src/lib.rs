//! Databin archive reader.
//!
//! A databin is a single large archive holding every game asset as an
//! individually zlib-compressed chunk addressed by a numeric id. Model assets
//! come in pairs: a TMC chunk at `id` and its TMCL companion at `id + 1`.
//!
//! # Format
//!
//! - 0x20-byte header (chunk info size, header size, directory size)
//! - Directory: chunk count, optional id→index map, chunk info offset table,
//!   0x18-byte chunk info records
//! - Chunk bodies, each a zlib stream
//!
//! Chunk info records carry the body offset, both sizes, an optional linked
//! chunk id and two category bytes.
//!
//! # Example
//!
//! ```no_run
//! use kunai_databin::{ByteProvider, Databin};
//!
//! let databin = Databin::open("databin")?;
//!
//! for info in databin.iter() {
//!     println!("{:05}: {} ({} bytes)", info.id, info.category, info.decompressed_size);
//! }
//!
//! // Soft-fail read: a broken chunk yields an empty buffer
//! let tmc = databin.read(1234).unwrap_or_default();
//! # Ok::<(), kunai_databin::Error>(())
//! ```

mod archive;
mod chunk;
mod decompress;
mod error;
mod provider;

pub use archive::Databin;
pub use chunk::{ChunkCategory, ChunkInfo, CompressedChunk, RawChunkInfo};
pub use decompress::{decompress_zlib, decompress_zlib_sized};
pub use error::{Error, Result};
pub use provider::ByteProvider;
