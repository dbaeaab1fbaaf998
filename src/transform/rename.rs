//! Regex renaming of dataset paths.

use log::info;
use regex::Regex;

use crate::container::Tree;

use super::TransformError;

/// Move every dataset whose physical path matches `pattern` to the
/// substituted path. Returns the number of datasets moved.
pub fn rename(tree: &mut Tree, pattern: &Regex, replacement: &str) -> Result<usize, TransformError> {
    let paths: Vec<String> = tree
        .dataset_paths()
        .into_iter()
        .filter(|path| pattern.is_match(path))
        .collect();
    let mut renamed = 0;
    for path in paths {
        let destination = pattern.replace_all(&path, replacement).into_owned();
        if destination == path {
            continue;
        }
        tree.move_node(&path, &destination)?;
        info!("Renamed {} to {}", path, destination);
        renamed += 1;
    }
    Ok(renamed)
}
