//! The byte-provider seam between archives and the model codec.

use crate::{decompress_zlib_sized, CompressedChunk};

/// Supplies compressed chunks by id and inflates them on demand.
///
/// Decompression is the one soft-fail boundary in the pipeline: a broken
/// chunk is logged and comes back as an empty buffer so batch tools can move
/// on to the next entry.
pub trait ByteProvider {
    /// Look up a chunk by id.
    fn get(&self, id: u32) -> Option<CompressedChunk<'_>>;

    /// Inflate a chunk. Returns an empty buffer on failure.
    fn decompress(&self, chunk: &CompressedChunk<'_>) -> Vec<u8> {
        if chunk.info.is_empty() {
            return Vec::new();
        }
        match decompress_zlib_sized(chunk.bytes, chunk.info.decompressed_size as usize) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(id = chunk.info.id, "failed to decompress chunk: {}", e);
                Vec::new()
            }
        }
    }

    /// Look up and inflate a chunk. `None` only when the id is unknown.
    fn read(&self, id: u32) -> Option<Vec<u8>> {
        self.get(id).map(|chunk| self.decompress(&chunk))
    }

    /// `id` followed by every chunk reachable through linked ids, stopping at
    /// the first unknown id or repeat.
    fn linked_chain(&self, id: u32) -> Vec<u32> {
        let mut chain = Vec::new();
        let mut next = self.get(id).map(|chunk| chunk.info);

        while let Some(info) = next {
            if chain.contains(&info.id) {
                break;
            }
            chain.push(info.id);
            next = info
                .linked_id
                .and_then(|linked| self.get(linked))
                .map(|chunk| chunk.info);
        }
        chain
    }
}
