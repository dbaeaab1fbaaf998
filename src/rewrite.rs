//! Re-creating a dataset with minimal types and new compression.

use log::debug;

use crate::container::{Compression, ContainerError, Dataset, DatasetValue, Tree};
use crate::minimize::minimize_dataset;

/// How a dataset is re-created
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub compression: Compression,
    /// Contents to store instead of the current ones
    pub replacement: Option<DatasetValue>,
}

impl RewriteOptions {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, value: DatasetValue) -> Self {
        self.replacement = Some(value);
        self
    }
}

/// Delete and re-create the dataset at `path` with every field in its minimal
/// type and the requested compression. Attributes are copied back in their
/// original order.
///
/// Returns `false` without touching the tree if `path` is not a dataset.
pub fn rewrite_dataset(tree: &mut Tree, path: &str, options: RewriteOptions) -> Result<bool, ContainerError> {
    if !tree.is_dataset(path) {
        debug!("{} is not a dataset, skipping rewrite", path);
        return Ok(false);
    }
    let (dataset, attrs) = tree.take_dataset(path)?;
    let value = minimize_dataset(options.replacement.unwrap_or(dataset.value))?;
    let id = tree.create_dataset(path, Dataset::new(value, options.compression))?;
    if let Some(target) = tree.attrs_mut(id) {
        *target = attrs;
    }
    debug!("Rewrote {} with {}", path, options.compression);
    Ok(true)
}
