//! Databin chunk metadata.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// On-disk chunk info record (0x18 bytes).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawChunkInfo {
    /// Body offset relative to the start of the chunk area.
    pub offset: u64,
    pub decompressed_size: u32,
    pub compressed_size: u32,
    pub unknown: u32,
    /// Linked chunk id, -1 when absent.
    pub linked_id: i16,
    pub group: u8,
    pub category: u8,
}

/// Content type of a chunk, from the last byte of its info record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChunkCategory {
    Language,
    Tdp4Actor,
    Tdp4Cloth,
    EffectPack,
    Tmc,
    ItemData,
    SpritePackL,
    CharacterData,
    RtmData,
    TdPack,
    Tdp4Sob,
    Tdp4Soc,
    SpritePack,
    StageEtc,
    Tdp4Style,
    Tnf,
    TnfL,
    Tmcl,
    XwsFile,
    Png,
    Wmv,
    Unknown(u8),
}

impl ChunkCategory {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Language,
            3 => Self::Tdp4Actor,
            4 => Self::Tdp4Cloth,
            8 => Self::EffectPack,
            11 => Self::Tmc,
            13 => Self::ItemData,
            15 => Self::SpritePackL,
            17 => Self::CharacterData,
            18 => Self::RtmData,
            19 => Self::TdPack,
            20 => Self::Tdp4Sob,
            21 => Self::Tdp4Soc,
            22 => Self::SpritePack,
            23 => Self::StageEtc,
            24 => Self::Tdp4Style,
            25 => Self::Tnf,
            26 => Self::TnfL,
            27 => Self::Tmcl,
            28 => Self::XwsFile,
            29 => Self::Png,
            30 => Self::Wmv,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Language => 0,
            Self::Tdp4Actor => 3,
            Self::Tdp4Cloth => 4,
            Self::EffectPack => 8,
            Self::Tmc => 11,
            Self::ItemData => 13,
            Self::SpritePackL => 15,
            Self::CharacterData => 17,
            Self::RtmData => 18,
            Self::TdPack => 19,
            Self::Tdp4Sob => 20,
            Self::Tdp4Soc => 21,
            Self::SpritePack => 22,
            Self::StageEtc => 23,
            Self::Tdp4Style => 24,
            Self::Tnf => 25,
            Self::TnfL => 26,
            Self::Tmcl => 27,
            Self::XwsFile => 28,
            Self::Png => 29,
            Self::Wmv => 30,
            Self::Unknown(other) => other,
        }
    }

    /// Name as used by the game's own tooling.
    pub fn name(self) -> &'static str {
        match self {
            Self::Language => "LANG",
            Self::Tdp4Actor => "TDP4ACT",
            Self::Tdp4Cloth => "TDP4CLD",
            Self::EffectPack => "TMC_effpk",
            Self::Tmc => "TMC",
            Self::ItemData => "itm_dat2",
            Self::SpritePackL => "sprpackL",
            Self::CharacterData => "chr_dat",
            Self::RtmData => "rtm_dat",
            Self::TdPack => "tdpack",
            Self::Tdp4Sob => "TDP4SOB",
            Self::Tdp4Soc => "TDP4SOC",
            Self::SpritePack => "sprpack",
            Self::StageEtc => "STAGEETC",
            Self::Tdp4Style => "TDP4STY",
            Self::Tnf => "TNF",
            Self::TnfL => "TNFL",
            Self::Tmcl => "TMCL",
            Self::XwsFile => "XWSFILE",
            Self::Png => "PNG",
            Self::Wmv => "WMV",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ChunkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "UNKNOWN{value}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Decoded chunk info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkInfo {
    pub id: u32,
    /// Body offset relative to the chunk area.
    pub offset: u64,
    pub decompressed_size: u32,
    pub compressed_size: u32,
    pub linked_id: Option<u32>,
    pub group: u8,
    pub category: ChunkCategory,
}

impl ChunkInfo {
    pub(crate) fn from_raw(id: u32, raw: &RawChunkInfo) -> Self {
        let linked_id = raw.linked_id;
        Self {
            id,
            offset: raw.offset,
            decompressed_size: raw.decompressed_size,
            compressed_size: raw.compressed_size,
            linked_id: u32::try_from(linked_id).ok(),
            group: raw.group,
            category: ChunkCategory::from_u8(raw.category),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.compressed_size == 0
    }
}

/// A chunk's info together with its still-compressed bytes.
#[derive(Debug, Clone, Copy)]
pub struct CompressedChunk<'a> {
    pub info: ChunkInfo,
    pub bytes: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_info_size() {
        assert_eq!(std::mem::size_of::<RawChunkInfo>(), 0x18);
    }

    #[test]
    fn test_category_roundtrip() {
        for value in 0..=u8::MAX {
            assert_eq!(ChunkCategory::from_u8(value).as_u8(), value);
        }
        assert_eq!(ChunkCategory::from_u8(11), ChunkCategory::Tmc);
        assert_eq!(ChunkCategory::from_u8(27).to_string(), "TMCL");
        assert_eq!(ChunkCategory::from_u8(200).to_string(), "UNKNOWN200");
    }

    #[test]
    fn test_linked_id() {
        let mut raw = RawChunkInfo {
            offset: 0,
            decompressed_size: 0,
            compressed_size: 0,
            unknown: 0,
            linked_id: -1,
            group: 0,
            category: 11,
        };
        assert_eq!(ChunkInfo::from_raw(5, &raw).linked_id, None);

        raw.linked_id = 6;
        let info = ChunkInfo::from_raw(5, &raw);
        assert_eq!(info.linked_id, Some(6));
        assert_eq!(info.category, ChunkCategory::Tmc);
    }
}
