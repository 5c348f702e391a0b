//! Parser and structural editor for TMC/TMCL model assets.
//!
//! A model is a TMC container whose records are typed sections (geometry,
//! materials, hierarchy, nodes, matrices, buffers, textures) plus a TMCL
//! companion holding the bodies of the buffer and texture sections. A
//! [`Model`] parses both into typed [`Section`]s, edits them while keeping
//! the object-parallel sections in step, and commits back to an
//! [`AssetPair`].
//!
//! # Editing
//!
//! - [`Model::insert_objects`]: copy objects from another model
//! - [`Model::remove_objects`]: drop objects whose name matches
//! - [`Model::sort_objects_by_name`] / [`Model::sort_objects_by_key`]
//! - [`Model::substitute_texture_buffer`], [`Model::set_texture_buffers`]
//!
//! Every edit renumbers ids, shifts cross references, rebuilds material
//! xrefs and rebuilds the node-type table. [`Model::check`] reports any
//! structural inconsistency.
//!
//! # Example
//!
//! ```no_run
//! use kunai_tmc::{InsertRemap, Model};
//!
//! let mut target = Model::open("01234.dat", "01235.dat")?;
//! let donor = Model::open("04000.dat", "04001.dat")?;
//!
//! target.remove_objects(|name| name.starts_with(b"OPTscat"));
//! target.insert_objects(&donor, 3..5, None, &InsertRemap::default());
//! target.sort_objects_by_name();
//! assert!(target.check().is_empty());
//!
//! target.commit()?.write_to("out", 1234)?;
//! # Ok::<(), kunai_tmc::Error>(())
//! ```

mod check;
mod editor;
mod error;
mod kind;
mod model;
mod section;

pub mod nodetype;
pub mod views;

#[cfg(test)]
mod fixtures;

pub use check::Inconsistency;
pub use editor::{InsertRemap, MaterialTarget};
pub use error::{Error, Result};
pub use kind::{SectionKind, GEO_DECL, NODE_OBJ, OBJ_GEO, OBJ_INFO, TMC, TTDH, TTDL};
pub use model::{AssetPair, Model};
pub use nodetype::{NodeClass, NodeTypeCatalog, NodeTypeTable};
pub use section::{Record, Section};
pub use views::*;
