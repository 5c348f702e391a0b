//! Typed sections: a container whose records share one view type.

use std::borrow::Cow;
use std::ops::{Index, IndexMut};

use kunai_container::{Container, ContainerParts, Encoded, Magic, SerializeOptions};

use crate::Result;

/// A record view parsed from, and written back to, one container record.
pub trait Record: Sized {
    /// Parse and validate the fixed layout of a record.
    fn parse(data: &[u8]) -> Result<Self>;

    /// The record bytes as they will be serialized.
    fn to_bytes(&self) -> Cow<'_, [u8]>;
}

/// A container with its records parsed as `R`.
///
/// Metadata, sub-container and layout options are kept as read so an
/// untouched section encodes to its original bytes.
#[derive(Debug, Clone)]
pub struct Section<R> {
    parts: ContainerParts,
    records: Vec<R>,
}

impl<R: Record> Section<R> {
    /// Parse a section that must carry `magic`.
    pub fn parse(magic: Magic, data: &[u8], companion: Option<&[u8]>) -> Result<Self> {
        let container = Container::parse(magic, data, companion)?;
        Self::from_container(&container)
    }

    /// Build from an already parsed container.
    pub fn from_container(container: &Container<'_>) -> Result<Self> {
        let mut parts = container.to_parts();
        let records = std::mem::take(&mut parts.records)
            .iter()
            .map(|record| R::parse(record))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { parts, records })
    }

    /// An empty section with the given layout.
    pub fn empty(magic: Magic, options: SerializeOptions) -> Self {
        Self {
            parts: ContainerParts::new(magic).with_options(options),
            records: Vec::new(),
        }
    }

    pub fn encode(&self) -> Encoded {
        let records: Vec<Cow<'_, [u8]>> = self.records.iter().map(R::to_bytes).collect();
        self.parts.encode_with(&records)
    }
}

impl<R> Section<R> {
    /// Encode with a different record list, keeping metadata and layout.
    pub fn encode_with<T: AsRef<[u8]>>(&self, records: &[T]) -> Encoded {
        self.parts.encode_with(records)
    }

    #[inline]
    pub fn magic(&self) -> Magic {
        self.parts.magic
    }

    #[inline]
    pub fn options(&self) -> SerializeOptions {
        self.parts.options
    }

    #[inline]
    pub fn metadata(&self) -> &[u8] {
        &self.parts.metadata
    }

    #[inline]
    pub fn metadata_mut(&mut self) -> &mut Vec<u8> {
        &mut self.parts.metadata
    }

    #[inline]
    pub fn sub_container(&self) -> &[u8] {
        &self.parts.sub_container
    }

    pub fn set_sub_container(&mut self, data: Vec<u8>) {
        self.parts.sub_container = data;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut R> {
        self.records.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, R> {
        self.records.iter_mut()
    }

    #[inline]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// The record list, for splicing and reordering.
    #[inline]
    pub fn records_mut(&mut self) -> &mut Vec<R> {
        &mut self.records
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }
}

impl<R> Index<usize> for Section<R> {
    type Output = R;

    fn index(&self, index: usize) -> &R {
        &self.records[index]
    }
}

impl<R> IndexMut<usize> for Section<R> {
    fn index_mut(&mut self, index: usize) -> &mut R {
        &mut self.records[index]
    }
}

impl<'s, R> IntoIterator for &'s Section<R> {
    type Item = &'s R;
    type IntoIter = std::slice::Iter<'s, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::RawRecord;
    use kunai_container::serialize;
    use pretty_assertions::assert_eq;

    const VTX: Magic = Magic::new(b"VtxLay");

    #[test]
    fn test_untouched_section_is_byte_stable() {
        let records = [vec![1u8; 0x20], Vec::new(), vec![3u8; 0x14]];
        let encoded = serialize(VTX, &records, &[7; 4], &[], &SerializeOptions::companion());

        let section: Section<RawRecord> =
            Section::parse(VTX, &encoded.data, encoded.companion.as_deref()).unwrap();
        assert_eq!(section.len(), 3);
        assert!(section[1].is_empty());
        assert_eq!(section.encode(), encoded);
    }

    #[test]
    fn test_edit_records() {
        let encoded = serialize(VTX, &[vec![1u8; 0x10]], &[], &[], &SerializeOptions::inline());
        let mut section: Section<RawRecord> = Section::parse(VTX, &encoded.data, None).unwrap();

        section.push(RawRecord::new(vec![2; 0x10]));
        section.records_mut().swap(0, 1);

        let encoded = section.encode();
        let reparsed: Section<RawRecord> = Section::parse(VTX, &encoded.data, None).unwrap();
        assert_eq!(reparsed[0].as_bytes(), &[2; 0x10][..]);
        assert_eq!(reparsed[1].as_bytes(), &[1; 0x10][..]);
    }
}
