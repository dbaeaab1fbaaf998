//! Round-trip self-test: compress a copy, revert it and compare.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use crate::equivalence::check_equivalent;
use crate::error::{FileError, ShrinkError};
use crate::locate::GroupFilter;
use crate::repack::Repacker;
use crate::transform::{Mode, RawCompressionPolicy, Transform};

use super::{
    find_fast5, prefixed_path, AssumeYes, CancellationToken, Confirm, FileJob, RunConfig, StdinConfirm, WorkerPool,
};

/// Prefix of the copies the self-test works on
pub const TEST_PREFIX: &str = "poreshrink.test";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfTestSummary {
    pub files: usize,
    pub mismatches: usize,
    pub failures: usize,
    pub interrupted: bool,
}

impl SelfTestSummary {
    /// Total mismatches plus failures; 0 is a pass
    pub fn exit_code(&self) -> i32 {
        let code = (self.mismatches + self.failures).min(i32::MAX as usize) as i32;
        if code == 0 && self.interrupted {
            1
        } else {
            code
        }
    }
}

pub struct SelfTest {
    config: RunConfig,
    forward: FileJob,
    inverse: FileJob,
    token: CancellationToken,
    confirm: Box<dyn Confirm>,
}

impl SelfTest {
    /// Raw mode has no inverse and is rejected before any file is touched
    pub fn new(
        config: RunConfig,
        mode: Mode,
        group: GroupFilter,
        repacker: Arc<dyn Repacker>,
    ) -> Result<Self, ShrinkError> {
        if !mode.is_reversible() {
            return Err(ShrinkError::Unsupported(format!("cannot self-test {} compression", mode)));
        }
        let policy = RawCompressionPolicy::default();
        let forward = Transform::select(mode, false, policy.clone(), group.clone())?;
        let inverse = Transform::select(mode, true, policy, group)?;
        let confirm: Box<dyn Confirm> = if config.assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm)
        };
        Ok(Self {
            config,
            forward: FileJob::new(forward, repacker.clone()).with_prefix(Some(TEST_PREFIX.to_string())),
            inverse: FileJob::new(inverse, repacker),
            token: CancellationToken::new(),
            confirm,
        })
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_confirm(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Inputs to test; earlier test copies are left out
    pub fn files(&self) -> Vec<PathBuf> {
        let marker = format!("{}.", TEST_PREFIX);
        find_fast5(&self.config.inputs, self.config.skip_root)
            .into_iter()
            .filter(|p| {
                !p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&marker))
            })
            .collect()
    }

    pub fn run(&self) -> Result<SelfTestSummary, ShrinkError> {
        let files = self.files();
        let mut summary = SelfTestSummary {
            files: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            warn!("No .fast5 files found");
            return Ok(summary);
        }
        let message = format!(
            "Testing {} and its inverse on {} files.",
            self.forward.transform().description().to_lowercase(),
            files.len()
        );
        if !self.confirm.confirm(&message) {
            return Err(ShrinkError::Cancelled);
        }

        let results = WorkerPool::new(self.config.threads).run(files, &self.token, |path| {
            let result = self.round_trip(&path);
            if let Err(e) = &result {
                if !matches!(e, FileError::Cancelled) {
                    error!("Self-test failed for {}: {}", path.display(), e);
                }
            }
            result
        });

        for result in results {
            match result {
                Ok(mismatches) => summary.mismatches += mismatches,
                Err(FileError::Cancelled) => summary.interrupted = true,
                Err(_) => summary.failures += 1,
            }
        }
        summary.interrupted |= self.token.is_cancelled();
        info!(
            "Self-test: {} files, {} mismatches, {} failures",
            summary.files, summary.mismatches, summary.failures
        );
        Ok(summary)
    }

    fn round_trip(&self, path: &Path) -> Result<usize, FileError> {
        let copy = prefixed_path(path, TEST_PREFIX);
        let result = self
            .forward
            .process(path, &self.token)
            .and_then(|outcome| self.inverse.process(&outcome.path, &self.token))
            .and_then(|outcome| Ok(check_equivalent(path, &outcome.path)?.mismatch_count()));
        if copy.exists() {
            if let Err(e) = fs::remove_file(&copy) {
                warn!("Could not remove {}: {}", copy.display(), e);
            }
        }
        result
    }
}
