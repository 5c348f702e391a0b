//! Container serialization.

use kunai_common::align::align_up;
use zerocopy::IntoBytes;

use crate::header::COMPANION_HEADER_OFFSET;
use crate::{
    CompanionHeader, ContainerHeader, Magic, COMPANION_HEADER_SIZE, COMPANION_PREFIX_SIZE,
    HEADER_SIZE, VERSION_BYTES,
};

/// Default padding boundary for every variable-size section.
pub const DEFAULT_ALIGNMENT: usize = 0x10;

/// When to write a record size table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeTable {
    /// Record sizes are inferred from the next offset on read.
    #[default]
    Omit,
    /// Always write exact record sizes.
    Emit,
    /// Write sizes only if some record is not a multiple of the alignment.
    WhenUnaligned,
}

/// Layout choices for [`serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Store record bodies in a companion buffer.
    pub companion: bool,
    /// Padding boundary, a power of two.
    pub alignment: usize,
    pub size_table: SizeTable,
    /// Copy the metadata blob into the reserved region of the companion buffer
    /// instead of leaving it zeroed.
    pub mirror_metadata: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            companion: false,
            alignment: DEFAULT_ALIGNMENT,
            size_table: SizeTable::Omit,
            mirror_metadata: false,
        }
    }
}

impl SerializeOptions {
    /// Inline records, no size table, 16-byte alignment.
    pub fn inline() -> Self {
        Self::default()
    }

    /// Companion-buffer records with an exact size table.
    pub fn companion() -> Self {
        Self {
            companion: true,
            size_table: SizeTable::Emit,
            ..Self::default()
        }
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_size_table(mut self, size_table: SizeTable) -> Self {
        self.size_table = size_table;
        self
    }

    pub fn with_mirrored_metadata(mut self, mirror: bool) -> Self {
        self.mirror_metadata = mirror;
        self
    }

    pub fn header_size(&self) -> u32 {
        if self.companion {
            COMPANION_HEADER_SIZE
        } else {
            HEADER_SIZE
        }
    }
}

/// The buffers produced by [`serialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub data: Vec<u8>,
    /// Present only for companion layout.
    pub companion: Option<Vec<u8>>,
}

impl Encoded {
    /// Parse the encoded buffers back into a read-only view.
    pub fn parse(&self, magic: Magic) -> crate::Result<crate::Container<'_>> {
        crate::Container::parse(magic, &self.data, self.companion.as_deref())
    }
}

/// Encode a container.
///
/// Metadata, tables, the sub-container and (inline) each record are padded
/// to `options.alignment`. Empty records are written as offset 0 and take no
/// space. Without a size table an unaligned record reads back with its
/// padding attached.
///
/// # Panics
///
/// Panics if `options.alignment` is not a power of two.
pub fn serialize<R: AsRef<[u8]>>(
    magic: Magic,
    records: &[R],
    metadata: &[u8],
    sub_container: &[u8],
    options: &SerializeOptions,
) -> Encoded {
    let align = options.alignment;
    assert!(
        align.is_power_of_two(),
        "invariant violation: alignment {align} is not a power of two"
    );

    let header_size = options.header_size() as usize;
    let metadata_size = align_up(metadata.len(), align);
    let offset_table_size = if records.is_empty() {
        0
    } else {
        align_up(4 * records.len(), align)
    };
    let emit_sizes = match options.size_table {
        SizeTable::Omit => false,
        SizeTable::Emit => true,
        SizeTable::WhenUnaligned => records.iter().any(|r| r.as_ref().len() % align != 0),
    };
    let size_table_size = if emit_sizes { offset_table_size } else { 0 };
    let sub_container_size = align_up(sub_container.len(), align);

    let padded: Vec<usize> = records
        .iter()
        .map(|r| align_up(r.as_ref().len(), align))
        .collect();
    let body_size: usize = padded.iter().sum();

    let tables_end =
        header_size + metadata_size + offset_table_size + size_table_size + sub_container_size;
    let container_size = tables_end + if options.companion { 0 } else { body_size };
    let companion_size = COMPANION_PREFIX_SIZE + metadata_size + body_size;
    let valid_record_count = records.iter().filter(|r| !r.as_ref().is_empty()).count() as u32;

    let offset_table_ofs = if offset_table_size > 0 {
        header_size + metadata_size
    } else {
        0
    };
    let size_table_ofs = if size_table_size > 0 {
        header_size + metadata_size + offset_table_size
    } else {
        0
    };
    let sub_container_ofs = if sub_container.is_empty() {
        0
    } else {
        header_size + metadata_size + offset_table_size + size_table_size
    };

    let header = ContainerHeader {
        magic: *magic.as_bytes(),
        version: VERSION_BYTES,
        header_size: header_size as u32,
        container_size: container_size as u32,
        record_count: records.len() as u32,
        valid_record_count,
        offset_table_ofs: offset_table_ofs as u32,
        size_table_ofs: size_table_ofs as u32,
        sub_container_ofs: sub_container_ofs as u32,
        ..ContainerHeader::default()
    };

    let mut data = vec![0u8; container_size];
    data[..HEADER_SIZE as usize].copy_from_slice(header.as_bytes());
    data[header_size..header_size + metadata.len()].copy_from_slice(metadata);

    let mut companion = if options.companion {
        let prefix = CompanionHeader::new(valid_record_count, companion_size as u32);
        data[COMPANION_HEADER_OFFSET..COMPANION_HEADER_OFFSET + COMPANION_PREFIX_SIZE]
            .copy_from_slice(prefix.as_bytes());

        let mut ldata = vec![0u8; companion_size];
        ldata[..COMPANION_PREFIX_SIZE].copy_from_slice(prefix.as_bytes());
        if options.mirror_metadata {
            ldata[COMPANION_PREFIX_SIZE..COMPANION_PREFIX_SIZE + metadata.len()]
                .copy_from_slice(metadata);
        }
        Some(ldata)
    } else {
        None
    };

    let mut cursor = if options.companion {
        COMPANION_PREFIX_SIZE + metadata_size
    } else {
        tables_end
    };
    for (i, record) in records.iter().enumerate() {
        let record = record.as_ref();
        let offset = if record.is_empty() { 0 } else { cursor };

        let slot = offset_table_ofs + 4 * i;
        data[slot..slot + 4].copy_from_slice(&(offset as u32).to_le_bytes());
        if size_table_ofs != 0 {
            let slot = size_table_ofs + 4 * i;
            data[slot..slot + 4].copy_from_slice(&(record.len() as u32).to_le_bytes());
        }

        let body = companion.as_mut().unwrap_or(&mut data);
        body[offset..offset + record.len()].copy_from_slice(record);
        cursor += padded[i];
    }

    if sub_container_ofs != 0 {
        data[sub_container_ofs..sub_container_ofs + sub_container.len()]
            .copy_from_slice(sub_container);
    }

    tracing::trace!(
        %magic,
        records = records.len(),
        size = container_size,
        companion = options.companion,
        "serialized container"
    );

    Encoded { data, companion }
}
