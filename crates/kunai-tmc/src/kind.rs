//! Section kinds and the container tags used inside a model.

use std::fmt;

use kunai_container::Magic;

/// Tag of the top-level model container.
pub const TMC: Magic = Magic::new(b"TMC");
/// Tag of one object's geometry inside `MdlGeo`.
pub const OBJ_GEO: Magic = Magic::new(b"ObjGeo");
/// Tag of the geometry-declaration sub-container of an `ObjGeo`.
pub const GEO_DECL: Magic = Magic::new(b"GeoDecl");
/// Tag of the texture slot table stored as `TTDM` metadata.
pub const TTDH: Magic = Magic::new(b"TTDH");
/// Tag of the companion texture payload list stored as the `TTDM` sub-container.
pub const TTDL: Magic = Magic::new(b"TTDL");
/// Tag of one object's info inside `MdlInfo`.
pub const OBJ_INFO: Magic = Magic::new(b"ObjInfo");
/// Tag of one node inside `NodeLay`.
pub const NODE_OBJ: Magic = Magic::new(b"NodeObj");

/// A top-level section of a TMC model, keyed by its type id.
///
/// The type-id table in the TMC metadata maps each top-level record to a
/// kind. The `LHeader` type-id table uses the companion ids, which set bit 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    MdlGeo,
    Ttdm,
    VtxLay,
    IdxLay,
    MtrCol,
    MdlInfo,
    HieLay,
    LHeader,
    NodeLay,
    GlblMtx,
    BnOfsMtx,
    Cpf,
    McaPack,
    RenPack,
}

const COMPANION_BIT: u32 = 0x4000_0000;

impl SectionKind {
    pub const ALL: [SectionKind; 14] = [
        Self::MdlGeo,
        Self::Ttdm,
        Self::VtxLay,
        Self::IdxLay,
        Self::MtrCol,
        Self::MdlInfo,
        Self::HieLay,
        Self::LHeader,
        Self::NodeLay,
        Self::GlblMtx,
        Self::BnOfsMtx,
        Self::Cpf,
        Self::McaPack,
        Self::RenPack,
    ];

    /// Sections every editable model must carry.
    pub const REQUIRED: [SectionKind; 11] = [
        Self::MdlGeo,
        Self::Ttdm,
        Self::VtxLay,
        Self::IdxLay,
        Self::MtrCol,
        Self::MdlInfo,
        Self::HieLay,
        Self::LHeader,
        Self::NodeLay,
        Self::GlblMtx,
        Self::BnOfsMtx,
    ];

    pub const fn type_id(self) -> u32 {
        match self {
            Self::MdlGeo => 0x8000_0001,
            Self::Ttdm => 0x8000_0002,
            Self::VtxLay => 0x8000_0003,
            Self::IdxLay => 0x8000_0004,
            Self::MtrCol => 0x8000_0005,
            Self::MdlInfo => 0x8000_0006,
            Self::HieLay => 0x8000_0010,
            Self::LHeader => 0x8000_0020,
            Self::NodeLay => 0x8000_0030,
            Self::GlblMtx => 0x8000_0040,
            Self::BnOfsMtx => 0x8000_0050,
            Self::Cpf => 0x8000_0060,
            Self::McaPack => 0x8000_0070,
            Self::RenPack => 0x8000_0080,
        }
    }

    /// Type id of the `LHeader` record holding this section's companion buffer.
    pub const fn companion_id(self) -> u32 {
        self.type_id() | COMPANION_BIT
    }

    pub fn from_type_id(type_id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_id() == type_id)
    }

    pub fn from_companion_id(type_id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.companion_id() == type_id)
    }

    pub const fn magic(self) -> Magic {
        match self {
            Self::MdlGeo => Magic::new(b"MdlGeo"),
            Self::Ttdm => Magic::new(b"TTDM"),
            Self::VtxLay => Magic::new(b"VtxLay"),
            Self::IdxLay => Magic::new(b"IdxLay"),
            Self::MtrCol => Magic::new(b"MtrCol"),
            Self::MdlInfo => Magic::new(b"MdlInfo"),
            Self::HieLay => Magic::new(b"HieLay"),
            Self::LHeader => Magic::new(b"LHeader"),
            Self::NodeLay => Magic::new(b"NodeLay"),
            Self::GlblMtx => Magic::new(b"GlblMtx"),
            Self::BnOfsMtx => Magic::new(b"BnOfsMtx"),
            Self::Cpf => Magic::new(b"cpf"),
            Self::McaPack => Magic::new(b"MCAPACK"),
            Self::RenPack => Magic::new(b"RENPACK"),
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.magic(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_type_id(kind.type_id()), Some(kind));
            assert_eq!(SectionKind::from_companion_id(kind.companion_id()), Some(kind));
        }
        assert_eq!(SectionKind::Ttdm.companion_id(), 0xC000_0002);
        assert_eq!(SectionKind::from_type_id(0x8000_0007), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(SectionKind::MdlGeo.to_string(), "MdlGeo");
        assert_eq!(SectionKind::Cpf.to_string(), "cpf");
        assert!(SectionKind::NodeLay.is_required());
        assert!(!SectionKind::RenPack.is_required());
    }
}
