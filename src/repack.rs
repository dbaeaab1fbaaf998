//! Rewriting a whole container file with a compression filter.
//!
//! Edits made through the container model can leave freed space behind in the
//! file, and dataset compression only takes effect once the file is written
//! out again. A [`Repacker`] produces a fresh copy of a container with the
//! requested filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use thiserror::Error;

use crate::container::{read_tree, write_tree, Compression, ContainerError};

#[derive(Debug, Error)]
pub enum RepackError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },
}

/// Writes `input` to `output` with every dataset compressed by `filter`
pub trait Repacker: Send + Sync {
    fn repack(&self, filter: Compression, input: &Path, output: &Path) -> Result<(), RepackError>;
}

/// Repacks tree archives in process
#[derive(Debug, Clone, Default)]
pub struct ArchiveRepacker;

impl Repacker for ArchiveRepacker {
    fn repack(&self, filter: Compression, input: &Path, output: &Path) -> Result<(), RepackError> {
        let mut tree = read_tree(input)?;
        for id in tree.dataset_ids() {
            if let Some(dataset) = tree.dataset_by_id_mut(id) {
                dataset.compression = filter;
            }
        }
        write_tree(&tree, output)?;
        Ok(())
    }
}

/// Runs an external tool as `<program> -f <filter> <input> <output>`
#[derive(Debug, Clone)]
pub struct CommandRepacker {
    program: PathBuf,
}

impl CommandRepacker {
    pub const DEFAULT_PROGRAM: &'static str = "h5repack";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for CommandRepacker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl Repacker for CommandRepacker {
    fn repack(&self, filter: Compression, input: &Path, output: &Path) -> Result<(), RepackError> {
        let program = self.program.display().to_string();
        let status = Command::new(&self.program)
            .arg("-f")
            .arg(filter.to_string())
            .arg(input)
            .arg(output)
            .status()
            .map_err(|source| RepackError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(RepackError::CommandFailed {
                program,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// `<file>.tmp`, the staging path of an in-place repack
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Repack `path` through its staging path and rename the result over it.
/// On failure the staging file is removed and `path` is left untouched.
pub fn repack_in_place(repacker: &dyn Repacker, filter: Compression, path: &Path) -> Result<(), RepackError> {
    let staging = staging_path(path);
    if let Err(e) = repacker.repack(filter, path, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::rename(&staging, path)?;
    debug!("Repacked {} with {}", path.display(), filter);
    Ok(())
}
