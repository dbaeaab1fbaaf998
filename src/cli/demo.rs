use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use poreshrink::demo::write_synthetic_reads;

/// Write synthetic reads into `dir`
pub fn run(dir: PathBuf, count: usize, seed: u64) -> Result<i32> {
    info!("poreshrink demo reads");
    info!("=====================");

    let paths = write_synthetic_reads(&dir, count, seed)
        .with_context(|| format!("Failed to write demo reads to {}", dir.display()))?;
    let total: u64 = paths
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    println!("Wrote {} reads ({} bytes) to {}", paths.len(), total, dir.display());
    println!();
    println!("Try:");
    println!("  poreshrink shrink deep-lossless {} --test -y", dir.display());
    Ok(0)
}
