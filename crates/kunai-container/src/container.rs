//! Read-only container view.

use std::ops::Range;

use kunai_common::BinaryReader;

use crate::header::COMPANION_HEADER_OFFSET;
use crate::{
    serialize, CompanionHeader, ContainerHeader, ContainerParts, Encoded, FormatError, Magic,
    Result, SerializeOptions, SizeTable, CHECK_CONSTANT, COMPANION_HEADER_SIZE,
    COMPANION_PREFIX_SIZE, DEFAULT_ALIGNMENT, HEADER_SIZE, VERSION_BYTES,
};

/// A parsed container borrowing its backing buffers.
///
/// Parsing never copies record bytes. To edit, convert to owned
/// [`ContainerParts`] with [`Container::to_parts`].
#[derive(Debug, Clone)]
pub struct Container<'a> {
    header: ContainerHeader,
    data: &'a [u8],
    companion: Option<&'a [u8]>,
    metadata: &'a [u8],
    sub_container: &'a [u8],
    records: Vec<&'a [u8]>,
    spans: Vec<Option<Range<usize>>>,
    options: SerializeOptions,
}

impl<'a> Container<'a> {
    /// Parse a container that must carry `magic`.
    ///
    /// `companion` is required when the header declares companion layout and
    /// ignored otherwise.
    pub fn parse(magic: Magic, data: &'a [u8], companion: Option<&'a [u8]>) -> Result<Self> {
        Self::parse_inner(Some(magic), data, companion)
    }

    /// Parse a container of any kind.
    pub fn parse_any(data: &'a [u8], companion: Option<&'a [u8]>) -> Result<Self> {
        Self::parse_inner(None, data, companion)
    }

    fn parse_inner(
        expected: Option<Magic>,
        data: &'a [u8],
        companion: Option<&'a [u8]>,
    ) -> Result<Self> {
        if data.len() < HEADER_SIZE as usize {
            return Err(FormatError::TruncatedBuffer {
                magic: Magic::new(data.get(..8).unwrap_or(data)),
                what: "header",
                needed: HEADER_SIZE as usize,
                available: data.len(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let header: ContainerHeader = reader.read_struct()?;
        let magic = header.magic();

        if let Some(expected) = expected {
            if magic != expected {
                return Err(FormatError::BadMagic {
                    expected,
                    actual: magic,
                });
            }
        }
        if header.version != VERSION_BYTES {
            return Err(FormatError::UnsupportedVersion(header.version));
        }

        let header_size = header.header_size;
        if header_size != HEADER_SIZE && header_size != COMPANION_HEADER_SIZE {
            return Err(FormatError::InvalidHeaderSize {
                magic,
                size: header_size,
            });
        }

        let container_size = header.container_size as usize;
        if container_size > data.len() || container_size < header_size as usize {
            return Err(FormatError::TruncatedBuffer {
                magic,
                what: "declared container size",
                needed: container_size.max(header_size as usize),
                available: data.len(),
            });
        }
        let data = &data[..container_size];

        let companion = if header.is_companion_layout() {
            let ldata = companion.ok_or(FormatError::MissingCompanionBuffer(magic))?;
            Some(Self::check_companion(magic, data, ldata)?)
        } else {
            None
        };

        let record_count = header.record_count as usize;
        let offsets = Self::read_table(magic, data, header.offset_table_ofs, record_count, "offset table")?;
        let sizes = Self::read_table(magic, data, header.size_table_ofs, record_count, "size table")?;

        let metadata_end = [
            header.offset_table_ofs,
            header.size_table_ofs,
            header.sub_container_ofs,
        ]
        .into_iter()
        .find(|&o| o != 0)
        .map_or(container_size, |o| o as usize);
        let metadata = Self::span(magic, data, header_size as usize, metadata_end, "metadata")?;

        let sub_container = match header.sub_container_ofs as usize {
            0 => &data[..0],
            start => {
                let end = match (&offsets, companion) {
                    (Some(offsets), None) => offsets
                        .iter()
                        .copied()
                        .find(|&o| o != 0)
                        .map_or(container_size, |o| o as usize),
                    _ => container_size,
                };
                Self::span(magic, data, start, end, "sub-container")?
            }
        };

        let source = companion.unwrap_or(data);
        let offsets = offsets.unwrap_or_default();
        let mut records = Vec::with_capacity(offsets.len());
        let mut spans = Vec::with_capacity(offsets.len());

        for (i, &offset) in offsets.iter().enumerate() {
            let start = offset as usize;
            let span = match &sizes {
                Some(sizes) if start != 0 && sizes[i] != 0 => Some(start..start + sizes[i] as usize),
                Some(_) => None,
                None if start == 0 => None,
                None => {
                    // A record runs to the next larger offset, the last one to
                    // the end of its buffer.
                    let end = offsets[i + 1..]
                        .iter()
                        .copied()
                        .find(|&o| o > offset)
                        .map_or(source.len(), |o| o as usize);
                    Some(start..end)
                }
            };

            match span {
                Some(span) => {
                    records.push(Self::span(magic, source, span.start, span.end, "record")?);
                    spans.push(Some(span));
                }
                None => {
                    records.push(&source[..0]);
                    spans.push(None);
                }
            }
        }

        let mirror_metadata = companion.is_some_and(|ldata| {
            metadata.iter().any(|&b| b != 0)
                && ldata[COMPANION_PREFIX_SIZE..].starts_with(metadata)
        });
        let options = SerializeOptions {
            companion: companion.is_some(),
            alignment: DEFAULT_ALIGNMENT,
            size_table: if sizes.is_some() {
                SizeTable::Emit
            } else {
                SizeTable::Omit
            },
            mirror_metadata,
        };

        tracing::trace!(
            %magic,
            records = records.len(),
            size = container_size,
            companion = companion.is_some(),
            "parsed container"
        );

        Ok(Self {
            header,
            data,
            companion,
            metadata,
            sub_container,
            records,
            spans,
            options,
        })
    }

    /// Cross-check the two copies of the companion header and truncate the
    /// companion buffer to its declared size.
    fn check_companion(magic: Magic, data: &[u8], ldata: &'a [u8]) -> Result<&'a [u8]> {
        if ldata.len() < COMPANION_PREFIX_SIZE {
            return Err(FormatError::TruncatedBuffer {
                magic,
                what: "companion header",
                needed: COMPANION_PREFIX_SIZE,
                available: ldata.len(),
            });
        }

        let primary: CompanionHeader =
            BinaryReader::new_at(data, COMPANION_HEADER_OFFSET).read_struct()?;
        let secondary: CompanionHeader = BinaryReader::new(ldata).read_struct()?;

        let fields = [
            ("valid record count", primary.valid_record_count, secondary.valid_record_count),
            ("companion size", primary.companion_size, secondary.companion_size),
            ("check constant", primary.check, secondary.check),
        ];
        for (field, primary, companion) in fields {
            if primary != companion {
                return Err(FormatError::HeaderMismatch {
                    magic,
                    field,
                    primary,
                    companion,
                });
            }
        }
        if primary.check != CHECK_CONSTANT {
            return Err(FormatError::HeaderMismatch {
                magic,
                field: "check constant",
                primary: primary.check,
                companion: CHECK_CONSTANT,
            });
        }

        let size = secondary.companion_size as usize;
        if size > ldata.len() || size < COMPANION_PREFIX_SIZE {
            return Err(FormatError::TruncatedBuffer {
                magic,
                what: "declared companion size",
                needed: size.max(COMPANION_PREFIX_SIZE),
                available: ldata.len(),
            });
        }
        Ok(&ldata[..size])
    }

    fn read_table(
        magic: Magic,
        data: &[u8],
        offset: u32,
        count: usize,
        what: &'static str,
    ) -> Result<Option<Vec<u32>>> {
        if offset == 0 {
            return Ok(None);
        }
        let start = offset as usize;
        let end = start.saturating_add(count.saturating_mul(4));
        let table = Self::span(magic, data, start, end, what)?;
        Ok(Some(BinaryReader::new(table).read_u32_array(count)?))
    }

    fn span<'b>(
        magic: Magic,
        data: &'b [u8],
        start: usize,
        end: usize,
        what: &'static str,
    ) -> Result<&'b [u8]> {
        if start > end || end > data.len() {
            return Err(FormatError::TruncatedBuffer {
                magic,
                what,
                needed: end.max(start),
                available: data.len(),
            });
        }
        Ok(&data[start..end])
    }

    #[inline]
    pub fn magic(&self) -> Magic {
        self.header.magic()
    }

    #[inline]
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    #[inline]
    pub fn is_companion_layout(&self) -> bool {
        self.companion.is_some()
    }

    /// The primary buffer, truncated to the declared container size.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// The companion buffer, truncated to its declared size.
    #[inline]
    pub fn companion(&self) -> Option<&'a [u8]> {
        self.companion
    }

    #[inline]
    pub fn metadata(&self) -> &'a [u8] {
        self.metadata
    }

    #[inline]
    pub fn sub_container(&self) -> &'a [u8] {
        self.sub_container
    }

    #[inline]
    pub fn records(&self) -> &[&'a [u8]] {
        &self.records
    }

    #[inline]
    pub fn record(&self, index: usize) -> Option<&'a [u8]> {
        self.records.get(index).copied()
    }

    /// Byte range of a record inside its source buffer (the companion buffer
    /// for companion layout). `None` for empty records.
    pub fn record_span(&self, index: usize) -> Option<Range<usize>> {
        self.spans.get(index).cloned().flatten()
    }

    /// Number of non-empty records.
    pub fn valid_record_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_empty()).count()
    }

    /// Serialization options that reproduce this container byte for byte.
    #[inline]
    pub fn options(&self) -> SerializeOptions {
        self.options
    }

    /// Copy everything into an owned, editable form.
    pub fn to_parts(&self) -> ContainerParts {
        ContainerParts {
            magic: self.magic(),
            metadata: self.metadata.to_vec(),
            sub_container: self.sub_container.to_vec(),
            records: self.records.iter().map(|r| r.to_vec()).collect(),
            options: self.options,
        }
    }

    /// Serialize the unmodified container again.
    pub fn reencode(&self) -> Encoded {
        serialize(
            self.magic(),
            &self.records,
            self.metadata,
            self.sub_container,
            &self.options,
        )
    }
}
