//! Untyped records: vertex/index buffers, texture payloads, matrices.

use std::borrow::Cow;

use kunai_common::field;

use crate::section::Record;
use crate::Result;

/// A record kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The leading 4x4 matrix of a `GlblMtx` or `BnOfsMtx` record.
    pub fn matrix(&self) -> Result<[f32; 16]> {
        Ok(field::f32_array_at(&self.0, 0)?)
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl Record for RawRecord {
    fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self(data.to_vec()))
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }
}
