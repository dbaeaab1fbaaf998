//! # poreshrink - Lossless shrinking of nanopore read containers
//!
//! `poreshrink` rewrites single-read nanopore containers so they take less
//! space on disk, and restores them again.
//!
//! ## Modes
//!
//! - **Lossless**: every event and alignment table is stored with the
//!   smallest integer type that holds its values and recompressed with
//!   GZIP level 9. Reverting recompresses with GZIP level 1.
//!
//! - **Deep lossless**: lossless, plus basecall event tables lose the columns
//!   that can be recomputed from the event detection table, and `start` is
//!   stored as row indices into it. The hierarchy is then collapsed under a
//!   single `Picopore` group. Reverting rebuilds everything exactly.
//!
//! - **Raw**: analysis datasets are deleted, keeping the raw signal. This
//!   cannot be reverted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poreshrink::container::Container;
//! use poreshrink::locate::GroupFilter;
//! use poreshrink::transform::{Mode, RawCompressionPolicy, Transform};
//!
//! let transform = Transform::select(
//!     Mode::DeepLossless,
//!     false,
//!     RawCompressionPolicy::default(),
//!     GroupFilter::All,
//! )?;
//!
//! let mut container = Container::open("read_0001.fast5")?;
//! let filter = transform.apply(container.tree_mut())?;
//! container.close()?;
//! println!("repack with {:?}", filter);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Batches of files go through a [`runner::Runner`], which discovers files,
//! asks for confirmation, runs a worker pool and reports total sizes.
//!
//! ## Container layout
//!
//! ```text
//! read_0001.fast5 (zip)
//! ├── mimetype                 # application/x-poreshrink-tree
//! ├── datasets/000000.parquet  # one Parquet blob per dataset
//! └── tree.json                # groups, attributes, dataset entries
//! ```

pub mod collapse;
pub mod container;
pub mod demo;
pub mod equivalence;
pub mod error;
pub mod locate;
pub mod minimize;
pub mod repack;
pub mod rewrite;
pub mod runner;
pub mod transform;
pub mod watch;

pub use container::{Container, Tree};
pub use equivalence::{check_equivalent, EquivalenceReport};
pub use error::{FileError, ShrinkError};
pub use repack::{ArchiveRepacker, CommandRepacker, Repacker};
pub use runner::{CancellationToken, FileJob, RunConfig, RunSummary, Runner};
pub use transform::{Mode, RawCompressionPolicy, Transform};
