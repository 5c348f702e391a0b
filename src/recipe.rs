//! JSON edit recipes for the `apply` command.
//!
//! A recipe names a target model, the donor models it borrows from and an
//! ordered list of edit steps:
//!
//! ```json
//! {
//!   "target": 1234,
//!   "donors": [4000],
//!   "steps": [
//!     { "op": "remove", "pattern": "OPTscat*" },
//!     { "op": "insert", "donor": 4000, "start": 3, "end": 5 },
//!     { "op": "copy_texture", "donor": 4000, "slot": 2 },
//!     { "op": "set_texture_buffers", "pattern": "WGT*", "buffers": [2] },
//!     { "op": "sort", "order": ["MOT", "OPT", "WGT"] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glob::Pattern;
use serde::Deserialize;

use kunai::tmc::{InsertRemap, MaterialTarget, Model, TextureDestination};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Id of the target TMC chunk; its TMCL is at `target + 1`.
    pub target: u32,
    /// Id the edited pair is written under, the target id by default.
    #[serde(default)]
    pub output: Option<u32>,
    #[serde(default)]
    pub donors: Vec<u32>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Remove objects whose node name matches a glob pattern.
    Remove { pattern: String },
    /// Copy objects `start..end` from a donor.
    Insert {
        donor: u32,
        start: usize,
        end: usize,
        /// Insert position, appended when absent.
        #[serde(default)]
        at: Option<usize>,
        /// Existing material for the inserted draws, copied from the donor when absent.
        #[serde(default)]
        material: Option<usize>,
        #[serde(default)]
        texture_buffers: Option<Vec<i32>>,
    },
    /// Sort objects by name, or by the position of their first matching prefix.
    Sort {
        #[serde(default)]
        order: Option<Vec<String>>,
    },
    /// Copy a donor texture payload, appending a slot unless `overwrite` names one.
    CopyTexture {
        donor: u32,
        slot: usize,
        #[serde(default)]
        overwrite: Option<usize>,
    },
    SetTextureBuffers { pattern: String, buffers: Vec<i32> },
}

impl Recipe {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid recipe {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let recipe: Self = serde_json::from_str(text)?;
        for step in &recipe.steps {
            if let Some(donor) = step.donor() {
                anyhow::ensure!(
                    recipe.donors.contains(&donor),
                    "step {} uses donor {donor} missing from the donor list",
                    step.name()
                );
            }
            if let Some(pattern) = step.pattern() {
                Pattern::new(pattern).with_context(|| format!("Invalid pattern {pattern:?}"))?;
            }
        }
        Ok(recipe)
    }

    pub fn output_id(&self) -> u32 {
        self.output.unwrap_or(self.target)
    }

    /// Run every step against `model`, logging what each one touched.
    pub fn apply(&self, model: &mut Model, donors: &BTreeMap<u32, Model>) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            let span = tracing::info_span!("step", index = i, op = step.name());
            let _enter = span.enter();
            step.apply(model, donors)?;
        }
        Ok(())
    }
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Remove { .. } => "remove",
            Self::Insert { .. } => "insert",
            Self::Sort { .. } => "sort",
            Self::CopyTexture { .. } => "copy_texture",
            Self::SetTextureBuffers { .. } => "set_texture_buffers",
        }
    }

    fn donor(&self) -> Option<u32> {
        match self {
            Self::Insert { donor, .. } | Self::CopyTexture { donor, .. } => Some(*donor),
            _ => None,
        }
    }

    fn pattern(&self) -> Option<&str> {
        match self {
            Self::Remove { pattern } | Self::SetTextureBuffers { pattern, .. } => Some(pattern),
            _ => None,
        }
    }

    pub fn apply(&self, model: &mut Model, donors: &BTreeMap<u32, Model>) -> Result<()> {
        let donor = |id: u32| {
            donors
                .get(&id)
                .with_context(|| format!("Donor {id} is not loaded"))
        };

        match self {
            Self::Remove { pattern } => {
                let matcher = name_matcher(pattern)?;
                let removed = model.remove_objects(matcher);
                tracing::info!(%pattern, removed, "removed objects");
            }
            Self::Insert {
                donor: id,
                start,
                end,
                at,
                material,
                texture_buffers,
            } => {
                let remap = InsertRemap {
                    material: material.map_or(MaterialTarget::CopyFromSource, MaterialTarget::Existing),
                    texture_buffers: texture_buffers.clone(),
                };
                let inserted = model.insert_objects(donor(*id)?, *start..*end, *at, &remap);
                tracing::info!(donor = id, ?inserted, "inserted objects");
            }
            Self::Sort { order: None } => model.sort_objects_by_name(),
            Self::Sort { order: Some(order) } => {
                let prefixes: Vec<&[u8]> = order.iter().map(|p| p.as_bytes()).collect();
                model.sort_objects_by_key(|name: &[u8]| prefix_rank(&prefixes, name));
            }
            Self::CopyTexture {
                donor: id,
                slot,
                overwrite,
            } => {
                let destination = overwrite.map_or(TextureDestination::Append, TextureDestination::Overwrite);
                let written = model.substitute_texture_buffer(donor(*id)?, *slot, destination);
                tracing::info!(donor = id, slot, written, "copied texture");
            }
            Self::SetTextureBuffers { pattern, buffers } => {
                let matcher = name_matcher(pattern)?;
                let updated = model.set_texture_buffers(matcher, buffers);
                tracing::info!(%pattern, updated, "set texture buffers");
            }
        }
        Ok(())
    }
}

/// Glob predicate over node names.
pub fn name_matcher(pattern: &str) -> Result<impl Fn(&[u8]) -> bool> {
    let pattern = Pattern::new(pattern).with_context(|| format!("Invalid pattern {pattern:?}"))?;
    Ok(move |name: &[u8]| pattern.matches(&String::from_utf8_lossy(name)))
}

/// Index of the first prefix `name` starts with; unmatched names sort last.
fn prefix_rank(prefixes: &[&[u8]], name: &[u8]) -> usize {
    prefixes
        .iter()
        .position(|prefix| name.starts_with(prefix))
        .unwrap_or(prefixes.len())
}
