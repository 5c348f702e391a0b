//! Alignment arithmetic.

/// Number of zero bytes needed to bring `len` up to a multiple of `alignment`.
#[inline]
pub const fn padding(len: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return 0;
    }
    (alignment - len % alignment) % alignment
}

/// `len` rounded up to a multiple of `alignment`.
#[inline]
pub const fn align_up(len: usize, alignment: usize) -> usize {
    len + padding(len, alignment)
}

/// Append zero bytes until `buf.len()` is a multiple of `alignment`.
#[inline]
pub fn pad_to(buf: &mut Vec<u8>, alignment: usize) {
    let pad = padding(buf.len(), alignment);
    buf.resize(buf.len() + pad, 0);
}
