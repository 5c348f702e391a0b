//! Decompression utilities for databin chunks.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{Error, Result};

/// Decompress a zlib stream.
pub fn decompress_zlib(data: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut decoder = ZlibDecoder::new(data);

    output.clear();
    decoder
        .read_to_end(output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    Ok(())
}

/// Upper bound on the deflate expansion ratio.
const MAX_EXPANSION: usize = 1032;

/// Decompress a zlib stream whose decompressed size is known.
///
/// The pre-allocation is capped by what `data` can inflate to.
pub fn decompress_zlib_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size.min(data.len().saturating_mul(MAX_EXPANSION)));
    decompress_zlib(data, &mut output)?;

    if output.len() != expected_size {
        return Err(Error::Decompression(format!(
            "size mismatch: expected {}, got {}",
            expected_size,
            output.len()
        )));
    }
    Ok(output)
}
