//! Databin archive reader.

use std::fs::File;
use std::path::Path;

use kunai_common::BinaryReader;
use memmap2::Mmap;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{ByteProvider, ChunkInfo, CompressedChunk, Error, RawChunkInfo, Result};

/// Fixed 0x20-byte archive header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
struct DatabinHeader {
    version: u32,
    chunk_info_size: u32,
    reserved0: [u32; 2],
    header_size: u32,
    directory_size: u32,
    reserved1: [u32; 2],
}

const CHUNK_TABLE_OFFSET: usize = 0x10;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => mmap,
            Self::Owned(data) => data,
        }
    }
}

/// A parsed databin archive.
///
/// Chunk bodies stay in the backing buffer and are inflated on demand
/// through [`ByteProvider`].
pub struct Databin {
    backing: Backing,
    name: String,
    /// Start of the chunk body area.
    chunk_area: usize,
    /// Chunk infos sorted by id.
    chunks: Vec<ChunkInfo>,
}

impl Databin {
    /// Open and memory-map a databin file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::from_backing(Backing::Mapped(mmap), name)
    }

    /// Parse a databin held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_backing(Backing::Owned(data), "memory".to_string())
    }

    fn from_backing(backing: Backing, name: String) -> Result<Self> {
        let (chunk_area, chunks) = Self::parse_directory(backing.as_slice())?;
        tracing::debug!(name = %name, chunks = chunks.len(), "opened databin");

        Ok(Self {
            backing,
            name,
            chunk_area,
            chunks,
        })
    }

    fn parse_directory(data: &[u8]) -> Result<(usize, Vec<ChunkInfo>)> {
        let header: DatabinHeader = BinaryReader::new(data).read_struct()?;

        let info_size = header.chunk_info_size as usize;
        if info_size < std::mem::size_of::<RawChunkInfo>() {
            return Err(Error::InvalidHeader(format!(
                "chunk info size {info_size:#x} is smaller than 0x18"
            )));
        }

        let dir_start = header.header_size as usize;
        let dir_end = dir_start
            .checked_add(header.directory_size as usize)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                Error::InvalidHeader(format!(
                    "directory {:#x}+{:#x} exceeds file size {:#x}",
                    dir_start,
                    { header.directory_size },
                    data.len()
                ))
            })?;
        let directory = &data[dir_start..dir_end];

        let mut reader = BinaryReader::new(directory);
        let count = reader.read_u32()? as usize;
        let map_offset = reader.read_u32()? as usize;
        let map_count = reader.read_u32()? as usize;

        reader.seek(CHUNK_TABLE_OFFSET);
        let info_offsets = reader.read_u32_array(count)?;

        let raw = info_offsets
            .iter()
            .map(|&offset| BinaryReader::new_at(directory, offset as usize).read_struct())
            .collect::<kunai_common::Result<Vec<RawChunkInfo>>>()?;

        let mut chunks = if map_count > 0 {
            map_count
                .checked_mul(8)
                .and_then(|size| map_offset.checked_add(size))
                .filter(|&end| end <= directory.len())
                .ok_or_else(|| {
                    Error::InvalidHeader(format!(
                        "id map {map_offset:#x} with {map_count} entries exceeds directory size {:#x}",
                        directory.len()
                    ))
                })?;
            let mut reader = BinaryReader::new_at(directory, map_offset);
            let mut chunks = Vec::with_capacity(map_count);
            for _ in 0..map_count {
                let id = reader.read_u32()?;
                let index = reader.read_u32()? as usize;
                let entry = raw.get(index).ok_or_else(|| {
                    Error::InvalidHeader(format!("id {id} maps to missing chunk {index}"))
                })?;
                chunks.push(ChunkInfo::from_raw(id, entry));
            }
            chunks
        } else {
            raw.iter()
                .enumerate()
                .map(|(index, entry)| ChunkInfo::from_raw(index as u32, entry))
                .collect()
        };
        chunks.sort_by_key(|info| info.id);

        Ok((dir_end, chunks))
    }

    /// Get the archive name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Iterate over chunk infos in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ChunkInfo> + '_ {
        self.chunks.iter()
    }

    /// Chunk info by id.
    pub fn info(&self, id: u32) -> Option<&ChunkInfo> {
        self.chunks
            .binary_search_by_key(&id, |info| info.id)
            .ok()
            .map(|index| &self.chunks[index])
    }

    /// Read and inflate a chunk, surfacing decompression errors.
    pub fn try_decompress(&self, id: u32) -> Result<Vec<u8>> {
        let chunk = self.get(id).ok_or(Error::ChunkNotFound(id))?;
        if chunk.info.is_empty() {
            return Ok(Vec::new());
        }
        crate::decompress_zlib_sized(chunk.bytes, chunk.info.decompressed_size as usize)
    }

    /// Read several chunks in parallel.
    #[cfg(feature = "parallel")]
    pub fn read_many(&self, ids: &[u32]) -> Vec<Result<Vec<u8>>> {
        use rayon::prelude::*;

        ids.par_iter().map(|&id| self.try_decompress(id)).collect()
    }

    /// Read several chunks.
    #[cfg(not(feature = "parallel"))]
    pub fn read_many(&self, ids: &[u32]) -> Vec<Result<Vec<u8>>> {
        ids.iter().map(|&id| self.try_decompress(id)).collect()
    }
}

impl ByteProvider for Databin {
    fn get(&self, id: u32) -> Option<CompressedChunk<'_>> {
        let info = *self.info(id)?;
        let data = self.backing.as_slice();

        let start = usize::try_from(info.offset)
            .ok()
            .and_then(|offset| self.chunk_area.checked_add(offset));
        let bytes = start
            .and_then(|start| Some(start..start.checked_add(info.compressed_size as usize)?))
            .and_then(|range| data.get(range));

        match bytes {
            Some(bytes) => Some(CompressedChunk { info, bytes }),
            None => {
                tracing::warn!(id, offset = info.offset, "chunk body lies outside the archive");
                Some(CompressedChunk { info, bytes: &[] })
            }
        }
    }
}

impl std::fmt::Debug for Databin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Databin")
            .field("name", &self.name)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkCategory;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    struct Entry<'a> {
        id: u32,
        payload: &'a [u8],
        linked: i16,
        category: u8,
    }

    fn build(entries: &[Entry<'_>], with_map: bool) -> Vec<u8> {
        let count = entries.len();
        let table_end = CHUNK_TABLE_OFFSET + count * 4;
        let infos_end = table_end + count * 0x18;
        let map_offset = if with_map { infos_end } else { 0 };
        let directory_size = if with_map { infos_end + count * 8 } else { infos_end };

        let mut bodies = Vec::new();
        let mut raw = Vec::new();
        for entry in entries {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(entry.payload).unwrap();
            let body = encoder.finish().unwrap();
            raw.push(RawChunkInfo {
                offset: bodies.len() as u64,
                decompressed_size: entry.payload.len() as u32,
                compressed_size: body.len() as u32,
                unknown: 0,
                linked_id: entry.linked,
                group: 0,
                category: entry.category,
            });
            bodies.extend_from_slice(&body);
        }

        let header = DatabinHeader {
            version: 0,
            chunk_info_size: 0x18,
            reserved0: [0; 2],
            header_size: 0x20,
            directory_size: directory_size as u32,
            reserved1: [0; 2],
        };

        let mut out = header.as_bytes().to_vec();
        out.extend_from_slice(&(count as u32).to_le_bytes());
        out.extend_from_slice(&(map_offset as u32).to_le_bytes());
        out.extend_from_slice(&(if with_map { count as u32 } else { 0 }).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        for index in 0..count {
            out.extend_from_slice(&((table_end + index * 0x18) as u32).to_le_bytes());
        }
        for info in &raw {
            out.extend_from_slice(info.as_bytes());
        }
        if with_map {
            for (index, entry) in entries.iter().enumerate() {
                out.extend_from_slice(&entry.id.to_le_bytes());
                out.extend_from_slice(&(index as u32).to_le_bytes());
            }
        }
        out.extend_from_slice(&bodies);
        out
    }

    #[test]
    fn test_read_with_id_map() {
        let data = build(
            &[
                Entry { id: 40, payload: b"TMC payload", linked: 41, category: 11 },
                Entry { id: 41, payload: b"TMCL payload", linked: -1, category: 27 },
            ],
            true,
        );
        let databin = Databin::from_bytes(data).unwrap();

        assert_eq!(databin.chunk_count(), 2);
        assert_eq!(databin.info(40).unwrap().category, ChunkCategory::Tmc);
        assert_eq!(databin.read(40).unwrap(), b"TMC payload");
        assert_eq!(databin.read(41).unwrap(), b"TMCL payload");
        assert_eq!(databin.read(0), None);
        assert_eq!(databin.linked_chain(40), vec![40, 41]);
    }

    #[test]
    fn test_ids_default_to_index() {
        let data = build(
            &[
                Entry { id: 0, payload: b"a", linked: -1, category: 0 },
                Entry { id: 0, payload: b"bb", linked: -1, category: 29 },
            ],
            false,
        );
        let databin = Databin::from_bytes(data).unwrap();

        let ids: Vec<u32> = databin.iter().map(|info| info.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(databin.try_decompress(1).unwrap(), b"bb");
        assert!(matches!(databin.try_decompress(7), Err(Error::ChunkNotFound(7))));
    }

    #[test]
    fn test_corrupt_body_soft_fails() {
        let mut data = build(&[Entry { id: 3, payload: b"payload", linked: -1, category: 11 }], true);
        // Body follows the 0x20 header and a 0x34-byte directory
        for byte in &mut data[0x54..] {
            *byte ^= 0xff;
        }

        let databin = Databin::from_bytes(data).unwrap();
        assert_eq!(databin.read(3), Some(Vec::new()));
        assert!(databin.try_decompress(3).is_err());
    }

    #[test]
    fn test_read_many() {
        let data = build(
            &[
                Entry { id: 1, payload: b"one", linked: -1, category: 11 },
                Entry { id: 2, payload: b"two", linked: -1, category: 27 },
            ],
            true,
        );
        let databin = Databin::from_bytes(data).unwrap();

        let results = databin.read_many(&[2, 1, 9]);
        assert_eq!(results[0].as_ref().unwrap(), b"two");
        assert_eq!(results[1].as_ref().unwrap(), b"one");
        assert!(results[2].is_err());
    }

    #[test]
    fn test_truncated_directory() {
        let mut data = build(&[Entry { id: 1, payload: b"x", linked: -1, category: 11 }], false);
        data[0x14..0x18].copy_from_slice(&0xffffu32.to_le_bytes());
        assert!(matches!(Databin::from_bytes(data), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_oversized_id_map() {
        let mut data = build(&[Entry { id: 1, payload: b"x", linked: -1, category: 11 }], true);
        // map_count in the directory preamble
        data[0x28..0x2c].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(Databin::from_bytes(data), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_id_map_past_directory() {
        let mut data = build(&[Entry { id: 1, payload: b"x", linked: -1, category: 11 }], true);
        // map_offset in the directory preamble
        data[0x24..0x28].copy_from_slice(&0x30u32.to_le_bytes());
        assert!(matches!(Databin::from_bytes(data), Err(Error::InvalidHeader(_))));
    }
}
