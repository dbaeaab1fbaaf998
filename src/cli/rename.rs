use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use poreshrink::error::ShrinkError;
use poreshrink::repack::ArchiveRepacker;
use poreshrink::runner::{CancellationToken, FileJob, RunConfig, Runner};
use poreshrink::transform::Transform;

/// Rename datasets in every file
pub fn run(
    pattern: String,
    replacement: String,
    inputs: Vec<PathBuf>,
    threads: usize,
    assume_yes: bool,
    skip_root: bool,
    token: CancellationToken,
) -> Result<i32> {
    let transform = Transform::rename(&pattern, replacement).context("Invalid rename pattern")?;
    let job = FileJob::new(transform, Arc::new(ArchiveRepacker));
    let config = RunConfig {
        inputs,
        threads,
        assume_yes,
        skip_root,
        ..RunConfig::default()
    };

    match Runner::new(config, job).with_token(token).run() {
        Ok(summary) => {
            println!("Successfully renamed {} of {} files", summary.processed(), summary.files);
            Ok(if summary.is_success() { 0 } else { 1 })
        }
        Err(ShrinkError::Cancelled) => {
            println!("User cancelled");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
