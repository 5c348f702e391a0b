//! Kunai - model asset extraction and editing for NINJA GAIDEN Master Collection.
//!
//! This crate provides a unified interface to the Kunai library ecosystem
//! for reading databin archives and editing the TMC models inside them.
//!
//! # Crates
//!
//! - [`kunai_common`] - Common utilities (binary reading, fixed-offset fields, alignment)
//! - [`kunai_container`] - Container codec (inline and companion layouts)
//! - [`kunai_databin`] - Databin archive reading (memory-mapped, zlib chunks)
//! - [`kunai_tmc`] - TMC/TMCL model views and structural editing
//!
//! # Example
//!
//! ```no_run
//! use kunai::prelude::*;
//!
//! let databin = Databin::open("databin")?;
//! let tmc = databin.try_decompress(1234)?;
//! let tmcl = databin.try_decompress(1235)?;
//!
//! let mut model = Model::parse(&tmc, &tmcl)?;
//! model.sort_objects_by_name();
//! println!("{} objects, {} problems", model.object_count(), model.check().len());
//!
//! model.commit()?.write_to("out", 1234)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use kunai_common as common;
pub use kunai_container as container;
pub use kunai_databin as databin;
pub use kunai_tmc as tmc;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kunai_common::BinaryReader;
    pub use kunai_container::{Container, ContainerParts, Magic, SerializeOptions};
    pub use kunai_databin::{ByteProvider, ChunkCategory, ChunkInfo, Databin};
    pub use kunai_tmc::{AssetPair, InsertRemap, MaterialTarget, Model, SectionKind};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
