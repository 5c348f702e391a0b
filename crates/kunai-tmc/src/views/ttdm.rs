//! Texture directory: slot table plus inline and companion payloads.
//!
//! A `TTDM` container stores a `TTDH` slot table as its metadata and a
//! `TTDL` container as its sub-container. Each slot points either at one of
//! the inline `TTDM` records or at a `TTDL` record living in the model's
//! companion file.

use std::borrow::Cow;

use kunai_common::{ByteOrder, LittleEndian};
use kunai_container::{serialize, Container, ContainerParts, Encoded, SerializeOptions};

use crate::error::ensure_len;
use crate::kind::{SectionKind, TTDH, TTDL};
use crate::section::{Record, Section};
use crate::views::RawRecord;
use crate::Result;

const IN_COMPANION: usize = 0x00;
const PAYLOAD_INDEX: usize = 0x04;

/// Size of a slot written by this crate.
pub const SLOT_SIZE: usize = 0x20;

/// One `TTDH` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    data: Vec<u8>,
}

impl TextureSlot {
    pub fn new(in_companion: bool, payload_index: i32) -> Self {
        let mut slot = Self {
            data: vec![0; SLOT_SIZE],
        };
        slot.set_in_companion(in_companion);
        slot.set_payload_index(payload_index);
        slot
    }

    /// Whether the payload is a `TTDL` record rather than an inline `TTDM` one.
    pub fn is_in_companion(&self) -> bool {
        self.data[IN_COMPANION] != 0
    }

    pub fn set_in_companion(&mut self, in_companion: bool) {
        self.data[IN_COMPANION] = in_companion as u8;
    }

    pub fn payload_index(&self) -> i32 {
        LittleEndian::read_i32(&self.data[PAYLOAD_INDEX..])
    }

    pub fn set_payload_index(&mut self, index: i32) {
        LittleEndian::write_i32(&mut self.data[PAYLOAD_INDEX..], index);
    }
}

impl Record for TextureSlot {
    fn parse(data: &[u8]) -> Result<Self> {
        ensure_len("TTDH slot", data, PAYLOAD_INDEX + 4)?;
        Ok(Self {
            data: data.to_vec(),
        })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }
}

/// Where [`TextureDirectory::substitute`] puts the copied payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDestination {
    /// Replace the payload behind an existing slot.
    Overwrite(usize),
    /// Add a new companion payload and a slot pointing at it.
    Append,
}

/// The `TTDM` section.
#[derive(Debug, Clone)]
pub struct TextureDirectory {
    parts: ContainerParts,
    slots: Option<Section<TextureSlot>>,
    inline: Vec<RawRecord>,
    companion: Option<Section<RawRecord>>,
}

impl TextureDirectory {
    /// Parse a `TTDM` section; `companion` is the `TTDL` companion buffer.
    pub fn parse(data: &[u8], companion: Option<&[u8]>) -> Result<Self> {
        let container = Container::parse(SectionKind::Ttdm.magic(), data, None)?;

        let slots = match container.metadata() {
            [] => None,
            metadata => Some(Section::parse(TTDH, metadata, None)?),
        };
        let ttdl = match container.sub_container() {
            [] => None,
            sub => Some(Section::parse(TTDL, sub, companion)?),
        };
        let inline = container
            .records()
            .iter()
            .map(|record| RawRecord::new(record.to_vec()))
            .collect();

        let mut parts = container.to_parts();
        parts.records.clear();

        Ok(Self {
            parts,
            slots,
            inline,
            companion: ttdl,
        })
    }

    /// Encode to the `TTDM` bytes and the `TTDL` companion buffer.
    pub fn encode(&self) -> Encoded {
        let metadata = match &self.slots {
            Some(slots) => Cow::Owned(slots.encode().data),
            None => Cow::Borrowed(&self.parts.metadata[..]),
        };
        let (sub_container, companion) = match &self.companion {
            Some(ttdl) => {
                let encoded = ttdl.encode();
                (Cow::Owned(encoded.data), encoded.companion)
            }
            None => (Cow::Borrowed(&self.parts.sub_container[..]), None),
        };
        let inline: Vec<&[u8]> = self.inline.iter().map(RawRecord::as_bytes).collect();

        let data = serialize(
            self.parts.magic,
            &inline,
            &metadata,
            &sub_container,
            &self.parts.options,
        )
        .data;
        Encoded { data, companion }
    }

    pub fn slots(&self) -> &[TextureSlot] {
        self.slots.as_ref().map_or(&[], |s| s.records())
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots().len()
    }

    pub fn inline_payloads(&self) -> &[RawRecord] {
        &self.inline
    }

    pub fn companion_payloads(&self) -> &[RawRecord] {
        self.companion.as_ref().map_or(&[], |c| c.records())
    }

    /// The payload a slot points at.
    pub fn payload(&self, slot: usize) -> Option<&[u8]> {
        let slot = self.slots().get(slot)?;
        let index = usize::try_from(slot.payload_index()).ok()?;
        let list = if slot.is_in_companion() {
            self.companion_payloads()
        } else {
            &self.inline
        };
        list.get(index).map(RawRecord::as_bytes)
    }

    /// Copy the payload behind `source`'s slot `src_slot` into this directory.
    ///
    /// Returns the destination slot index.
    ///
    /// # Panics
    ///
    /// Panics if either slot is missing or points outside its payload list.
    pub fn substitute(
        &mut self,
        source: &TextureDirectory,
        src_slot: usize,
        destination: TextureDestination,
    ) -> usize {
        let payload = match source.payload(src_slot) {
            Some(payload) => RawRecord::new(payload.to_vec()),
            None => panic!("invariant violation: source texture slot {src_slot} has no payload"),
        };

        match destination {
            TextureDestination::Overwrite(dst_slot) => {
                let (in_companion, index) = match self.slots().get(dst_slot) {
                    Some(slot) => (slot.is_in_companion(), slot.payload_index()),
                    None => panic!("invariant violation: texture slot {dst_slot} does not exist"),
                };
                let list = if in_companion {
                    match &mut self.companion {
                        Some(ttdl) => ttdl.records_mut(),
                        None => panic!("invariant violation: texture slot {dst_slot} points into a missing TTDL"),
                    }
                } else {
                    &mut self.inline
                };
                let target = usize::try_from(index).ok().and_then(|i| list.get_mut(i));
                match target {
                    Some(target) => *target = payload,
                    None => panic!(
                        "invariant violation: texture slot {dst_slot} points at missing payload {index}"
                    ),
                }
                tracing::debug!(src_slot, dst_slot, "overwrote texture payload");
                dst_slot
            }
            TextureDestination::Append => {
                let ttdl = self
                    .companion
                    .get_or_insert_with(|| Section::empty(TTDL, SerializeOptions::companion()));
                let index = ttdl.len() as i32;
                ttdl.push(payload);

                let slots = self
                    .slots
                    .get_or_insert_with(|| Section::empty(TTDH, SerializeOptions::inline()));
                slots.push(TextureSlot::new(true, index));
                tracing::debug!(src_slot, dst_slot = slots.len() - 1, "appended texture payload");
                slots.len() - 1
            }
        }
    }
}
