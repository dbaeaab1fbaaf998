//! The transforms applied to an open container.
//!
//! Every transform edits the in-memory tree and returns the compression
//! filter the file should be repacked with, or `None` when no repack is
//! needed.

pub mod deep;
pub mod lossless;
pub mod raw;
pub mod rename;


use std::fmt;
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;

use crate::collapse::CollapseError;
use crate::container::{Compression, ContainerError, Tree};
use crate::error::ShrinkError;
use crate::locate::GroupFilter;
use crate::minimize::TypeError;

pub use raw::RawCompressionPolicy;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Collapse error: {0}")]
    Collapse(#[from] CollapseError),

    #[error("No sampling rate at /{0}")]
    MissingSamplingRate(String),

    #[error("{path} has no field '{field}'")]
    MissingField { path: String, field: String },

    #[error("Cannot align {path}: row {row} (index {index}) has no event detection match")]
    Alignment { path: String, row: usize, index: i128 },

    #[error("No event detection linked to {0}")]
    UnlinkedEvents(String),
}

/// Compression mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lossless,
    DeepLossless,
    Raw,
}

impl Mode {
    /// Whether the mode has an inverse
    pub fn is_reversible(&self) -> bool {
        !matches!(self, Mode::Raw)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Lossless => write!(f, "lossless"),
            Mode::DeepLossless => write!(f, "deep-lossless"),
            Mode::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lossless" => Ok(Mode::Lossless),
            "deep-lossless" | "deep_lossless" => Ok(Mode::DeepLossless),
            "raw" => Ok(Mode::Raw),
            _ => Err(format!(
                "Unknown mode '{}'. Valid options: lossless, deep-lossless, raw",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransformKind {
    LosslessCompress,
    LosslessDecompress,
    DeepLosslessCompress,
    DeepLosslessDecompress,
    RawCompress(RawCompressionPolicy),
    Rename { pattern: Regex, replacement: String },
}

/// A transform together with the analysis runs it applies to
#[derive(Debug, Clone)]
pub struct Transform {
    kind: TransformKind,
    group: GroupFilter,
}

impl Transform {
    pub fn new(kind: TransformKind, group: GroupFilter) -> Self {
        Self { kind, group }
    }

    /// Pick the forward or inverse transform of a mode.
    ///
    /// Raw compression discards data and has no inverse; asking for one is
    /// rejected here, before any file is opened.
    pub fn select(
        mode: Mode,
        revert: bool,
        policy: RawCompressionPolicy,
        group: GroupFilter,
    ) -> Result<Self, ShrinkError> {
        let kind = match (mode, revert) {
            (Mode::Lossless, false) => TransformKind::LosslessCompress,
            (Mode::Lossless, true) => TransformKind::LosslessDecompress,
            (Mode::DeepLossless, false) => TransformKind::DeepLosslessCompress,
            (Mode::DeepLossless, true) => TransformKind::DeepLosslessDecompress,
            (Mode::Raw, false) => TransformKind::RawCompress(policy),
            (Mode::Raw, true) => {
                return Err(ShrinkError::Unsupported(
                    "cannot revert from raw compression: discarded analyses are unrecoverable".to_string(),
                ))
            }
        };
        Ok(Self::new(kind, group))
    }

    /// Rename every dataset matching `pattern` over the whole tree
    pub fn rename(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::new(
            TransformKind::Rename {
                pattern: Regex::new(pattern)?,
                replacement: replacement.into(),
            },
            GroupFilter::All,
        ))
    }

    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub fn group(&self) -> &GroupFilter {
        &self.group
    }

    /// True for the inverse transforms
    pub fn is_revert(&self) -> bool {
        matches!(
            self.kind,
            TransformKind::LosslessDecompress | TransformKind::DeepLosslessDecompress
        )
    }

    /// Short description for the confirmation prompt
    pub fn description(&self) -> String {
        match &self.kind {
            TransformKind::LosslessCompress => "Performing lossless compression".to_string(),
            TransformKind::LosslessDecompress => "Performing lossless decompression".to_string(),
            TransformKind::DeepLosslessCompress => "Performing deep lossless compression".to_string(),
            TransformKind::DeepLosslessDecompress => {
                "Performing deep lossless decompression".to_string()
            }
            TransformKind::RawCompress(_) => "Performing raw compression".to_string(),
            TransformKind::Rename {
                pattern,
                replacement,
            } => format!("Renaming {} to {}", pattern.as_str(), replacement),
        }
    }

    /// Apply to a tree; returns the repack filter, if any
    pub fn apply(&self, tree: &mut Tree) -> Result<Option<Compression>, TransformError> {
        let filter = match &self.kind {
            TransformKind::LosslessCompress => lossless::compress(tree, &self.group)?,
            TransformKind::LosslessDecompress => lossless::decompress(tree, &self.group)?,
            TransformKind::DeepLosslessCompress => deep::compress(tree, &self.group)?,
            TransformKind::DeepLosslessDecompress => deep::decompress(tree, &self.group)?,
            TransformKind::RawCompress(policy) => raw::compress(tree, &self.group, policy)?,
            TransformKind::Rename {
                pattern,
                replacement,
            } => {
                rename::rename(tree, pattern, replacement)?;
                return Ok(None);
            }
        };
        Ok(Some(filter))
    }
}
