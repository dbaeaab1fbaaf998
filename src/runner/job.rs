//! The work done for one file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::container::Container;
use crate::error::FileError;
use crate::repack::{repack_in_place, Repacker};
use crate::transform::Transform;

use super::pool::CancellationToken;

/// Sizes of one processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// The file that was transformed: the input, or its prefixed copy
    pub path: PathBuf,
    pub size_before: u64,
    pub size_after: u64,
}

/// `<dir>/<prefix>.<name>`
pub fn prefixed_path(path: &Path, prefix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}", prefix, name))
}

/// Open, transform, commit and repack a single file
#[derive(Clone)]
pub struct FileJob {
    transform: Transform,
    repacker: Arc<dyn Repacker>,
    prefix: Option<String>,
}

impl FileJob {
    pub fn new(transform: Transform, repacker: Arc<dyn Repacker>) -> Self {
        Self {
            transform,
            repacker,
            prefix: None,
        }
    }

    /// Transform a copy named `<prefix>.<name>` instead of the input
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn process(&self, path: &Path, token: &CancellationToken) -> Result<FileOutcome, FileError> {
        let checkpoint = || {
            if token.is_cancelled() {
                Err(FileError::Cancelled)
            } else {
                Ok(())
            }
        };

        checkpoint()?;
        let target = match &self.prefix {
            Some(prefix) => {
                let copy = prefixed_path(path, prefix);
                fs::copy(path, &copy)?;
                copy
            }
            None => path.to_path_buf(),
        };
        let size_before = fs::metadata(&target)?.len();

        let mut container = Container::open(&target)?;
        let filter = self.transform.apply(container.tree_mut())?;

        checkpoint()?;
        container.close()?;

        if let Some(filter) = filter {
            checkpoint()?;
            repack_in_place(self.repacker.as_ref(), filter, &target)?;
        }

        let size_after = fs::metadata(&target)?.len();
        debug!(
            "{}: {} -> {} bytes",
            target.display(),
            size_before,
            size_after
        );
        Ok(FileOutcome {
            path: target,
            size_before,
            size_after,
        })
    }
}

impl std::fmt::Debug for FileJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJob")
            .field("transform", &self.transform)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
