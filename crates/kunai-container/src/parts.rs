//! Owned, editable container contents.

use crate::{serialize, Encoded, Magic, SerializeOptions};

/// An owned copy of a container's sections.
///
/// Edits happen here; [`ContainerParts::encode`] produces the new buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerParts {
    pub magic: Magic,
    pub metadata: Vec<u8>,
    pub sub_container: Vec<u8>,
    pub records: Vec<Vec<u8>>,
    pub options: SerializeOptions,
}

impl ContainerParts {
    /// An empty inline container.
    pub fn new(magic: Magic) -> Self {
        Self {
            magic,
            metadata: Vec::new(),
            sub_container: Vec::new(),
            records: Vec::new(),
            options: SerializeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SerializeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn encode(&self) -> Encoded {
        serialize(
            self.magic,
            &self.records,
            &self.metadata,
            &self.sub_container,
            &self.options,
        )
    }

    /// Encode with a different record list, keeping every other section.
    pub fn encode_with<R: AsRef<[u8]>>(&self, records: &[R]) -> Encoded {
        serialize(
            self.magic,
            records,
            &self.metadata,
            &self.sub_container,
            &self.options,
        )
    }
}
