//! Batch execution of a transform over many files.
//!
//! ```text
//! inputs ──discover──▶ files ──confirm──▶ WorkerPool ──FileJob──▶ RunSummary
//!                                            ▲
//!                    ReadsFolder (realtime) ─┘
//! ```
//!
//! Each file is one unit of work. A failing file is logged and counted; the
//! batch continues with the next one.

mod discover;
mod job;
mod pool;
mod progress;
mod realtime;
mod selftest;

pub use discover::{find_fast5, is_fast5, FAST5_EXTENSION};
pub use job::{prefixed_path, FileJob, FileOutcome};
pub use pool::{CancellationToken, WorkerPool};
pub use progress::Progress;
pub use realtime::RealtimeRunner;
pub use selftest::{SelfTest, SelfTestSummary, TEST_PREFIX};

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{FileError, ShrinkError};

/// Options shared by every batch
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub threads: usize,
    pub assume_yes: bool,
    pub skip_root: bool,
    pub print_every: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            threads: 1,
            assume_yes: false,
            skip_root: false,
            print_every: Progress::DEFAULT_PRINT_EVERY,
        }
    }
}

/// Asks the user to go ahead with a batch
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Prompts on stdout and reads the answer from stdin
#[derive(Debug, Default)]
pub struct StdinConfirm;

/// Any non-empty prefix of `yes` confirms
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    !answer.is_empty() && "yes".starts_with(answer.as_str())
}

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        print!("{}\nAre you sure? (yes|no): ", message);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

/// Confirms without asking
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Result of a batch
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files handed to the pool
    pub files: usize,
    pub outcomes: Vec<FileOutcome>,
    pub failures: Vec<(PathBuf, String)>,
    /// Sum of input sizes before the transform
    pub pre_size: u64,
    pub interrupted: bool,
    pub reverted: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Sum of file sizes after the transform
    pub fn post_size(&self) -> u64 {
        self.outcomes.iter().map(|o| o.size_after).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    pub fn size_report(&self) -> SizeReport {
        SizeReport {
            before: self.pre_size,
            after: self.post_size(),
            reverted: self.reverted,
        }
    }

    fn collect(files: usize, results: Vec<(PathBuf, Result<FileOutcome, FileError>)>) -> Self {
        let mut summary = RunSummary {
            files,
            ..Default::default()
        };
        for (path, result) in results {
            match result {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(FileError::Cancelled) => summary.interrupted = true,
                Err(e) => summary.failures.push((path, e.to_string())),
            }
        }
        summary
    }
}

/// Two aligned lines of total sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub before: u64,
    pub after: u64,
    pub reverted: bool,
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, second) = if self.reverted {
            ("Compressed size:", "Reverted size:")
        } else {
            ("Original size:", "Compressed size:")
        };
        let width = first.len().max(second.len());
        writeln!(f, "{:<width$} {}", first, self.before, width = width)?;
        write!(f, "{:<width$} {}", second, self.after, width = width)
    }
}

/// Runs one [`FileJob`] over the discovered files
pub struct Runner {
    config: RunConfig,
    job: FileJob,
    token: CancellationToken,
    confirm: Box<dyn Confirm>,
}

impl Runner {
    pub fn new(config: RunConfig, job: FileJob) -> Self {
        Self {
            config,
            job,
            token: CancellationToken::new(),
            confirm: Box::new(StdinConfirm),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_confirm(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn files(&self) -> Vec<PathBuf> {
        find_fast5(&self.config.inputs, self.config.skip_root)
    }

    /// Discover, confirm and process
    pub fn run(&self) -> Result<RunSummary, ShrinkError> {
        let files = self.files();
        self.run_files(files)
    }

    pub fn run_files(&self, files: Vec<PathBuf>) -> Result<RunSummary, ShrinkError> {
        if files.is_empty() {
            warn!("No .fast5 files found");
            return Ok(RunSummary {
                reverted: self.job.transform().is_revert(),
                ..Default::default()
            });
        }

        let message = format!("{} on {} files.", self.job.transform().description(), files.len());
        if self.config.assume_yes {
            info!("{}", message);
        } else if !self.confirm.confirm(&message) {
            return Err(ShrinkError::Cancelled);
        }

        let pre_size = files.iter().map(|f| input_size(f)).sum();
        let progress = Progress::new(self.config.print_every);
        let count = files.len();

        let results = WorkerPool::new(self.config.threads).run(files, &self.token, |path| {
            let result = self.job.process(&path, &self.token);
            match &result {
                Ok(_) => progress.tick(),
                Err(FileError::Cancelled) => {}
                Err(e) => error!("Failed to process {}: {}", path.display(), e),
            }
            (path, result)
        });

        let mut summary = RunSummary::collect(count, results);
        summary.pre_size = pre_size;
        summary.reverted = self.job.transform().is_revert();
        summary.interrupted |= self.token.is_cancelled();
        if summary.interrupted {
            warn!("Interrupted after {} of {} files", summary.processed(), count);
        }
        Ok(summary)
    }
}

/// Size of an input before it is transformed; unreadable inputs count as 0
fn input_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("Cannot read size of {}: {}", path.display(), e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("read.fast5");
        fs::write(&path, [0u8; 37]).unwrap();
        assert_eq!(input_size(&path), 37);
        assert_eq!(input_size(&dir.path().join("gone.fast5")), 0);
    }

    #[test]
    fn test_yes_prefixes() {
        for answer in ["y", "ye", "yes", "Yes\n", " y "] {
            assert!(is_yes(answer), "{answer}");
        }
        for answer in ["", "\n", "n", "no", "yess", "yeah"] {
            assert!(!is_yes(answer), "{answer}");
        }
    }

    #[test]
    fn test_size_report_alignment() {
        let report = SizeReport {
            before: 2048,
            after: 1024,
            reverted: false,
        };
        assert_eq!(report.to_string(), "Original size:   2048\nCompressed size: 1024");
        let report = SizeReport {
            reverted: true,
            ..report
        };
        assert_eq!(report.to_string(), "Compressed size: 2048\nReverted size:   1024");
    }
}
