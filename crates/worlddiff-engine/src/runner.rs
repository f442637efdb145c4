use crate::diff::DiffEngine;
use crate::mode::Mode;
use futures::future::join_all;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use worlddiff_common::{Dimension, Result};
use worlddiff_logger::{log, LogSeverity};
use worlddiff_world::{Region, Registries};

/// Where to read, where to write and what to keep.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub world1: PathBuf,
    pub world2: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub dimension: Dimension,
}

impl RunConfig {
    /// The two worlds in diff order. ADD diffs the newer world against the older.
    pub fn inputs(&self) -> (&Path, &Path) {
        if self.mode.swaps_inputs() {
            (self.world2.as_path(), self.world1.as_path())
        } else {
            (self.world1.as_path(), self.world2.as_path())
        }
    }
}

/// Per-region outcome counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    /// Already present in the output.
    pub skipped: usize,
    /// No counterpart in the second world.
    pub missing: usize,
    pub failed: usize,
}

enum Outcome {
    Written,
    Failed,
}

/// Names of the `.mca` files in `dir`.
fn region_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".mca") {
                names.push(name.to_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Reads both regions, diffs them and writes the result. Nothing is written
/// unless the whole region succeeds.
pub fn diff_region(
    engine: &DiffEngine,
    dimension: Dimension,
    path_a: &Path,
    path_b: &Path,
    out_path: &Path,
) -> Result<()> {
    let name = path_a.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let region_b = Region::read(path_b, dimension)?;
    let region_a = Region::read(path_a, dimension)?;

    log(format!("Diffing region {}", name), LogSeverity::Info);
    let output = engine.diff_regions(&region_a, &region_b)?;

    log(format!("Saving region {}", name), LogSeverity::Info);
    output.write(out_path)
}

/// Diffs every region of the first world that is not yet in the output, one
/// blocking task per region.
pub async fn run(config: RunConfig, registries: Arc<Registries>) -> Result<RunSummary> {
    let (world_a, world_b) = config.inputs();
    let dir_a = config.dimension.region_dir(world_a);
    let dir_b = config.dimension.region_dir(world_b);
    let out_dir = config.dimension.region_dir(&config.output);
    fs::create_dir_all(&out_dir)?;

    let converted: HashSet<String> = region_files(&out_dir)?.into_iter().collect();
    let engine = Arc::new(DiffEngine::new(config.mode, registries));
    let mut summary = RunSummary::default();
    let mut jobs = Vec::new();

    for name in region_files(&dir_a)? {
        if converted.contains(&name) {
            log(format!("Skipping converted region {}", name), LogSeverity::Debug);
            summary.skipped += 1;
            continue;
        }
        let path_b = dir_b.join(&name);
        if !path_b.is_file() {
            log(format!("Region {} doesn't exist in {}", name, world_b.display()), LogSeverity::Info);
            summary.missing += 1;
            continue;
        }

        let engine = Arc::clone(&engine);
        let dimension = config.dimension;
        let path_a = dir_a.join(&name);
        let out_path = out_dir.join(&name);
        jobs.push(tokio::task::spawn_blocking(move || {
            match diff_region(&engine, dimension, &path_a, &path_b, &out_path) {
                Ok(()) => Outcome::Written,
                Err(e) => {
                    log(format!("Failed to diff region {}: {}", name, e), LogSeverity::Error);
                    Outcome::Failed
                }
            }
        }));
    }

    for result in join_all(jobs).await {
        match result {
            Ok(Outcome::Written) => summary.written += 1,
            Ok(Outcome::Failed) => summary.failed += 1,
            Err(e) => {
                log(format!("Region worker panicked: {}", e), LogSeverity::Error);
                summary.failed += 1;
            }
        }
    }

    log(
        format!(
            "Wrote {} regions, skipped {}, {} without counterpart, {} failed",
            summary.written, summary.skipped, summary.missing, summary.failed
        ),
        if summary.failed > 0 {
            LogSeverity::Warning
        } else {
            LogSeverity::Info
        },
    );
    Ok(summary)
}
