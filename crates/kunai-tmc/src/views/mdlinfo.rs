//! Per-object info containers.

use std::borrow::Cow;

use kunai_common::{ByteOrder, LittleEndian};

use crate::error::ensure_len;
use crate::kind::OBJ_INFO;
use crate::section::{Record, Section};
use crate::views::RawRecord;
use crate::Result;

const ID: usize = 0x04;

/// An `ObjInfo` container. Only its id is interpreted.
#[derive(Debug, Clone)]
pub struct ObjInfo {
    section: Section<RawRecord>,
}

impl ObjInfo {
    pub fn id(&self) -> i32 {
        LittleEndian::read_i32(&self.section.metadata()[ID..])
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        LittleEndian::write_i32(&mut self.section.metadata_mut()[ID..], id);
    }

    pub fn records(&self) -> &[RawRecord] {
        self.section.records()
    }
}

impl Record for ObjInfo {
    fn parse(data: &[u8]) -> Result<Self> {
        let section = Section::parse(OBJ_INFO, data, None)?;
        ensure_len("ObjInfo metadata", section.metadata(), ID + 4)?;
        Ok(Self { section })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.section.encode().data)
    }
}
