//! Typed views over model records.
//!
//! Each view validates its fixed layout once at parse time and then reads
//! and patches fields at fixed little-endian offsets. Views whose record
//! holds a variable-length list (xrefs, children, members) rebuild the
//! record when the list length changes and patch in place otherwise.
//!
//! # Structure Overview
//!
//! - [`ObjGeo`]: one object's geometry
//!   - [`DrawChunk`]: material index, [`TextureBinding`]s, buffer ranges
//!   - [`GeoDeclEntry`]: vertex/index buffer indices, [`VertexElement`]s
//! - [`MaterialRecord`]: color block plus [`Xref`] list
//! - [`HierarchyNode`]: matrix, parent, children, level
//! - [`NodeObject`]: node name plus [`NodeData`] with node-group members
//! - [`ObjInfo`]: per-object info id
//! - [`TextureDirectory`]: [`TextureSlot`]s over inline and companion payloads
//! - [`RawRecord`]: buffers and matrices kept as bytes

mod geodecl;
mod hielay;
mod mdlinfo;
mod mtrcol;
mod nodelay;
mod objgeo;
mod raw;
mod ttdm;

pub use geodecl::{GeoDecl, GeoDeclEntry, VertexElement};
pub use hielay::{HierarchyNode, NO_PARENT};
pub use mdlinfo::ObjInfo;
pub use mtrcol::{MaterialRecord, Xref, COLOR_COUNT};
pub use nodelay::{NodeData, NodeObject};
pub use objgeo::{DrawChunk, ObjGeo, TextureBinding, HARD_TRANSPARENCY_ON, MAX_TEXTURES};
pub use raw::RawRecord;
pub use ttdm::{TextureDestination, TextureDirectory, TextureSlot, SLOT_SIZE};
