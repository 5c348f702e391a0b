//! Material records and their object cross-references.

use std::borrow::Cow;

use kunai_common::align::pad_to;
use kunai_common::{field, ByteOrder, LittleEndian};

use crate::error::ensure_len;
use crate::section::Record;
use crate::Result;

/// Number of f32 values in the color/shading block.
pub const COLOR_COUNT: usize = 52;

const COLORS_SIZE: usize = COLOR_COUNT * 4;
const ID: usize = 0xd0;
const XREF_COUNT: usize = 0xd4;
const XREFS: usize = 0xd8;

/// How many draw chunks of one object use a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Xref {
    pub object_index: i32,
    pub count: i32,
}

impl Xref {
    pub fn new(object_index: i32, count: i32) -> Self {
        Self {
            object_index,
            count,
        }
    }
}

/// A `MtrCol` record.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    data: Vec<u8>,
}

impl MaterialRecord {
    /// A new material with the given colors and xrefs. The id is assigned on commit.
    pub fn new(colors: &[f32; COLOR_COUNT], xrefs: &[Xref]) -> Self {
        let mut data = Vec::with_capacity(XREFS + 8 * xrefs.len());
        for value in colors {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let mut record = Self { data };
        record.rebuild_xrefs(xrefs);
        record
    }

    pub fn colors(&self) -> [f32; COLOR_COUNT] {
        let mut out = [0.0; COLOR_COUNT];
        LittleEndian::read_f32_into(&self.data[..COLORS_SIZE], &mut out);
        out
    }

    pub fn id(&self) -> i32 {
        LittleEndian::read_i32(&self.data[ID..])
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        LittleEndian::write_i32(&mut self.data[ID..], id);
    }

    pub fn xref_count(&self) -> usize {
        LittleEndian::read_u32(&self.data[XREF_COUNT..]) as usize
    }

    pub fn xrefs(&self) -> Vec<Xref> {
        (0..self.xref_count())
            .map(|i| {
                let at = XREFS + 8 * i;
                Xref::new(
                    LittleEndian::read_i32(&self.data[at..]),
                    LittleEndian::read_i32(&self.data[at + 4..]),
                )
            })
            .collect()
    }

    /// Replace the xref list, in place when the count is unchanged.
    pub fn set_xrefs(&mut self, xrefs: &[Xref]) {
        if xrefs.len() == self.xref_count() {
            for (i, xref) in xrefs.iter().enumerate() {
                let at = XREFS + 8 * i;
                LittleEndian::write_i32(&mut self.data[at..], xref.object_index);
                LittleEndian::write_i32(&mut self.data[at + 4..], xref.count);
            }
        } else {
            self.rebuild_xrefs(xrefs);
        }
    }

    fn rebuild_xrefs(&mut self, xrefs: &[Xref]) {
        self.data.truncate(XREFS);
        LittleEndian::write_u32(&mut self.data[XREF_COUNT..], xrefs.len() as u32);
        for xref in xrefs {
            self.data.extend_from_slice(&xref.object_index.to_le_bytes());
            self.data.extend_from_slice(&xref.count.to_le_bytes());
        }
        pad_to(&mut self.data, 0x10);
    }
}

impl Record for MaterialRecord {
    fn parse(data: &[u8]) -> Result<Self> {
        ensure_len("MtrCol", data, XREFS)?;
        let count = field::u32_at(data, XREF_COUNT)? as usize;
        ensure_len("MtrCol", data, XREFS.saturating_add(count.saturating_mul(8)))?;

        Ok(Self {
            data: data.to_vec(),
        })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn colors() -> [f32; COLOR_COUNT] {
        std::array::from_fn(|i| i as f32 * 0.5)
    }

    #[test]
    fn test_new_material_layout() {
        let record = MaterialRecord::new(&colors(), &[Xref::new(2, 1)]);

        assert_eq!(record.to_bytes().len(), 0xe0);
        assert_eq!(record.xrefs(), vec![Xref::new(2, 1)]);
        assert_eq!(record.colors()[3], 1.5);
        assert_eq!(record.id(), 0);
    }

    #[test]
    fn test_set_xrefs_in_place() {
        let mut record = MaterialRecord::new(&colors(), &[Xref::new(2, 1)]);
        record.set_xrefs(&[Xref::new(1, 1)]);

        let reparsed = MaterialRecord::parse(&record.to_bytes()).unwrap();
        assert_eq!(reparsed.xrefs(), vec![Xref::new(1, 1)]);
        assert_eq!(reparsed.to_bytes().len(), 0xe0);
    }

    #[test]
    fn test_set_xrefs_grows_and_shrinks() {
        let mut record = MaterialRecord::new(&colors(), &[]);
        record.set_id(4);
        assert_eq!(record.to_bytes().len(), 0xe0);

        let xrefs = [Xref::new(0, 2), Xref::new(1, 1), Xref::new(5, 3)];
        record.set_xrefs(&xrefs);
        assert_eq!(record.to_bytes().len(), 0xf0);
        assert_eq!(record.xrefs(), xrefs.to_vec());
        assert_eq!(record.id(), 4);
        assert_eq!(record.colors(), colors());

        record.set_xrefs(&[]);
        assert_eq!(record.xref_count(), 0);
        assert_eq!(record.to_bytes().len(), 0xe0);
    }

    #[test]
    fn test_truncated_xrefs() {
        let mut data = MaterialRecord::new(&colors(), &[]).to_bytes().into_owned();
        LittleEndian::write_u32(&mut data[XREF_COUNT..], 2);
        assert!(MaterialRecord::parse(&data).is_err());
    }
}
