//! Kunai CLI - Command-line tool for NINJA GAIDEN Master Collection model assets.
//!
//! This is the main entry point for the Kunai command-line application.

mod recipe;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use kunai::prelude::*;

use crate::recipe::Recipe;

/// Kunai - NINJA GAIDEN Master Collection model extraction and editing tool
#[derive(Parser)]
#[command(name = "kunai")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chunks of a databin archive
    List {
        /// Path to the databin file
        #[arg(short, long, env = "KUNAI_DATABIN")]
        databin: PathBuf,

        /// Category filter (glob-style, e.g. "TMC*")
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Extract chunks from a databin archive as `{id:05}.dat` files
    Extract {
        /// Path to the databin file
        #[arg(short, long, env = "KUNAI_DATABIN")]
        databin: PathBuf,

        /// Output directory
        #[arg(short, long, env = "KUNAI_OUTPUT")]
        output: PathBuf,

        /// Chunk ids (all chunks when omitted)
        #[arg(short, long, value_delimiter = ',')]
        ids: Vec<u32>,

        /// Also extract chunks reachable through linked ids
        #[arg(short, long)]
        linked: bool,
    },

    /// Print the container tree of a file
    Inspect {
        /// Container file
        input: PathBuf,

        /// Companion file holding the top container's record bodies
        #[arg(short, long)]
        companion: Option<PathBuf>,

        /// Emit JSON instead of an indented tree
        #[arg(long)]
        json: bool,
    },

    /// Check that a TMC/TMCL pair re-serializes to identical bytes
    Roundtrip {
        /// TMC file
        tmc: PathBuf,

        /// TMCL file
        tmcl: PathBuf,
    },

    /// Report structural inconsistencies of a TMC/TMCL pair
    Check {
        /// TMC file
        tmc: PathBuf,

        /// TMCL file
        tmcl: PathBuf,
    },

    /// Apply a JSON edit recipe and write the edited pair
    Apply {
        /// Recipe file
        recipe: PathBuf,

        /// Databin to read models from
        #[arg(short, long, env = "KUNAI_DATABIN", conflicts_with = "dir")]
        databin: Option<PathBuf>,

        /// Directory of extracted `{id:05}.dat` files to read models from
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, env = "KUNAI_OUTPUT")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { databin, filter } => {
            cmd_list(&databin, filter.as_deref())?;
        }
        Commands::Extract {
            databin,
            output,
            ids,
            linked,
        } => {
            cmd_extract(&databin, &output, &ids, linked)?;
        }
        Commands::Inspect {
            input,
            companion,
            json,
        } => {
            cmd_inspect(&input, companion.as_deref(), json)?;
        }
        Commands::Roundtrip { tmc, tmcl } => {
            cmd_roundtrip(&tmc, &tmcl)?;
        }
        Commands::Check { tmc, tmcl } => {
            cmd_check(&tmc, &tmcl)?;
        }
        Commands::Apply {
            recipe,
            databin,
            dir,
            output,
        } => {
            let source = match (databin, dir) {
                (Some(path), _) => ModelSource::Databin(
                    Databin::open(&path).with_context(|| format!("Failed to open databin {}", path.display()))?,
                ),
                (None, Some(dir)) => ModelSource::Dir(dir),
                (None, None) => anyhow::bail!("Either --databin or --dir is required"),
            };
            cmd_apply(&recipe, &source, &output)?;
        }
    }

    Ok(())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn cmd_list(path: &Path, filter: Option<&str>) -> Result<()> {
    let databin = Databin::open(path).context("Failed to open databin")?;
    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let mut count = 0;
    for info in databin.iter() {
        let category = info.category.to_string();
        if pattern.as_ref().is_some_and(|p| !p.matches(&category)) {
            continue;
        }

        let linked = info.linked_id.map(|id| format!("{id:05}")).unwrap_or_default();
        println!(
            "{:05} {:<10} {:>10} {:>10} {}",
            info.id, category, info.compressed_size, info.decompressed_size, linked
        );
        count += 1;
    }

    println!("\nTotal: {} of {} chunks", count, databin.chunk_count());

    Ok(())
}

fn cmd_extract(path: &Path, output: &Path, ids: &[u32], linked: bool) -> Result<()> {
    println!("Opening databin: {}", path.display());

    let start = Instant::now();
    let databin = Databin::open(path).context("Failed to open databin")?;

    println!("Loaded {} chunks in {:?}", databin.chunk_count(), start.elapsed());

    let mut selected: Vec<u32> = if ids.is_empty() {
        databin.iter().map(|info| info.id).collect()
    } else if linked {
        ids.iter().flat_map(|&id| databin.linked_chain(id)).collect()
    } else {
        ids.to_vec()
    };
    selected.sort_unstable();
    selected.dedup();

    println!("Extracting {} chunks...", selected.len());

    fs::create_dir_all(output)?;
    let pb = progress_bar(selected.len())?;

    let start = Instant::now();
    let mut failed = 0;
    for &id in &selected {
        pb.inc(1);
        let Some(data) = databin.read(id) else {
            tracing::warn!(id, "unknown chunk id");
            failed += 1;
            continue;
        };

        // An empty buffer for a non-empty chunk is a soft-failed decompression
        let expected = databin.info(id).map_or(0, |info| info.decompressed_size);
        if data.is_empty() && expected > 0 {
            failed += 1;
            continue;
        }
        fs::write(output.join(format!("{id:05}.dat")), data)?;
    }

    pb.finish_with_message("Done");
    println!(
        "Extracted {} chunks in {:?} ({} failed)",
        selected.len() - failed,
        start.elapsed(),
        failed
    );

    Ok(())
}

/// One container in the `inspect` tree.
#[derive(Serialize)]
struct ContainerNode {
    magic: String,
    companion_layout: bool,
    size: usize,
    metadata_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Box<ContainerNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_container: Option<Box<ContainerNode>>,
    records: Vec<RecordNode>,
}

#[derive(Serialize)]
struct RecordNode {
    index: usize,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<ContainerNode>,
}

impl ContainerNode {
    fn build(container: &Container<'_>) -> Self {
        let nested = |data: &[u8]| {
            Container::parse_any(data, None)
                .ok()
                .map(|inner| ContainerNode::build(&inner))
        };

        Self {
            magic: container.magic().to_string(),
            companion_layout: container.is_companion_layout(),
            size: container.as_bytes().len(),
            metadata_size: container.metadata().len(),
            metadata: nested(container.metadata()).map(Box::new),
            sub_container: nested(container.sub_container()).map(Box::new),
            records: container
                .records()
                .iter()
                .enumerate()
                .map(|(index, record)| RecordNode {
                    index,
                    size: record.len(),
                    container: nested(*record),
                })
                .collect(),
        }
    }

    fn print(&self, depth: usize) {
        let indent = "  ".repeat(depth);
        println!(
            "{indent}{} ({} bytes, {} records{}{})",
            self.magic,
            self.size,
            self.records.len(),
            if self.companion_layout { ", companion" } else { "" },
            if self.metadata_size > 0 {
                format!(", {} bytes metadata", self.metadata_size)
            } else {
                String::new()
            }
        );
        if let Some(metadata) = &self.metadata {
            println!("{indent}  metadata:");
            metadata.print(depth + 2);
        }
        if let Some(sub) = &self.sub_container {
            println!("{indent}  sub-container:");
            sub.print(depth + 2);
        }
        for record in &self.records {
            match &record.container {
                Some(container) => {
                    println!("{indent}  [{}]", record.index);
                    container.print(depth + 2);
                }
                None => println!("{indent}  [{}] {} bytes", record.index, record.size),
            }
        }
    }
}

fn cmd_inspect(input: &Path, companion: Option<&Path>, json: bool) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let companion = companion
        .map(fs::read)
        .transpose()
        .context("Failed to read companion file")?;

    let container =
        Container::parse_any(&data, companion.as_deref()).context("Failed to parse container")?;
    let tree = ContainerNode::build(&container);

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        tree.print(0);
    }

    Ok(())
}

fn open_model(tmc: &Path, tmcl: &Path) -> Result<Model> {
    Model::open(tmc, tmcl)
        .with_context(|| format!("Failed to parse model {} / {}", tmc.display(), tmcl.display()))
}

fn cmd_roundtrip(tmc: &Path, tmcl: &Path) -> Result<()> {
    let model = open_model(tmc, tmcl)?;
    let pair = model.commit().context("Failed to commit model")?;

    let mut mismatched = false;
    for (name, path, encoded) in [("TMC", tmc, &pair.primary), ("TMCL", tmcl, &pair.companion)] {
        let original = fs::read(path)?;
        match first_difference(&original, encoded) {
            None => println!("{name}: identical ({} bytes)", original.len()),
            Some(offset) => {
                println!(
                    "{name}: differs at 0x{offset:x} ({} bytes in, {} bytes out)",
                    original.len(),
                    encoded.len()
                );
                mismatched = true;
            }
        }
    }

    if mismatched {
        anyhow::bail!("Round trip is not byte-stable");
    }
    Ok(())
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

fn cmd_check(tmc: &Path, tmcl: &Path) -> Result<()> {
    let model = open_model(tmc, tmcl)?;

    println!(
        "{}: {} objects, {} materials, {} texture slots",
        String::from_utf8_lossy(model.name()),
        model.object_count(),
        model.mtrcol().len(),
        model.ttdm().slot_count()
    );

    let report = model.check();
    for problem in &report {
        println!("  {problem}");
    }

    if !report.is_empty() {
        anyhow::bail!("{} inconsistencies found", report.len());
    }
    println!("No inconsistencies found");
    Ok(())
}

/// Where `apply` reads models from.
enum ModelSource {
    Databin(Databin),
    Dir(PathBuf),
}

impl ModelSource {
    fn load(&self, id: u32) -> Result<Model> {
        match self {
            Self::Databin(databin) => {
                let tmc = databin.try_decompress(id).with_context(|| format!("Failed to read TMC {id:05}"))?;
                let tmcl = databin
                    .try_decompress(id + 1)
                    .with_context(|| format!("Failed to read TMCL {:05}", id + 1))?;
                Model::parse(&tmc, &tmcl).with_context(|| format!("Failed to parse model {id:05}"))
            }
            Self::Dir(dir) => {
                let (tmc, tmcl) = AssetPair::file_names(id);
                open_model(&dir.join(tmc), &dir.join(tmcl))
            }
        }
    }
}

fn cmd_apply(recipe_path: &Path, source: &ModelSource, output: &Path) -> Result<()> {
    let recipe = Recipe::load(recipe_path)?;

    let mut model = source.load(recipe.target)?;
    let donors = recipe
        .donors
        .iter()
        .map(|&id| Ok((id, source.load(id)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    recipe.apply(&mut model, &donors)?;

    let report = model.check();
    for problem in &report {
        tracing::warn!("{problem}");
    }

    let pair = model.commit().context("Failed to commit model")?;
    fs::create_dir_all(output)?;
    let (tmc, tmcl) = pair
        .write_to(output, recipe.output_id())
        .context("Failed to write model")?;

    println!("Wrote {} and {}", tmc.display(), tmcl.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(b"abc", b"abc"), None);
        assert_eq!(first_difference(b"abc", b"abd"), Some(2));
        assert_eq!(first_difference(b"abc", b"ab"), Some(2));
    }

    #[test]
    fn test_cli_parses_apply() {
        let cli = Cli::try_parse_from(["kunai", "-v", "apply", "r.json", "--dir", "in", "-o", "out"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Apply { dir: Some(_), .. }));
    }
}
