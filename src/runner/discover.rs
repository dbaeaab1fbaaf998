//! Finding the container files named by the command line.

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

/// File extension of the containers processed
pub const FAST5_EXTENSION: &str = "fast5";

pub fn is_fast5(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == FAST5_EXTENSION)
}

/// Every `.fast5` file named by `inputs`, sorted and de-duplicated.
///
/// Directories are walked recursively. With `skip_root`, files lying directly
/// in an input directory are left out; files in its subdirectories are kept.
pub fn find_fast5(inputs: &[PathBuf], skip_root: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            if is_fast5(input) {
                files.push(input.clone());
            }
            continue;
        }
        if !input.is_dir() {
            warn!("{} does not exist, skipping", input.display());
            continue;
        }
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", input.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_fast5(entry.path()) {
                continue;
            }
            if skip_root && entry.depth() == 1 {
                continue;
            }
            files.push(entry.into_path());
        }
    }
    files.sort();
    files.dedup();
    files
}
