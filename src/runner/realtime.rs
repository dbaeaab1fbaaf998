//! Processing files as they appear in watched folders.

use std::path::PathBuf;
use std::thread;

use crossbeam_channel::unbounded;
use log::{error, info};

use crate::error::{FileError, ShrinkError};
use crate::watch::{ReadsFolder, WatchConfig};

use super::{CancellationToken, FileJob, Progress, RunSummary, WorkerPool};

/// Feeds a worker pool from a [`ReadsFolder`] until cancelled
pub struct RealtimeRunner {
    watch: WatchConfig,
    job: FileJob,
    threads: usize,
    print_every: u32,
    token: CancellationToken,
}

impl RealtimeRunner {
    pub fn new(watch: WatchConfig, job: FileJob, threads: usize) -> Self {
        let watch = match job.prefix() {
            Some(prefix) => watch.with_ignore_prefix(Some(prefix.to_string())),
            None => watch,
        };
        Self {
            watch,
            job,
            threads,
            print_every: Progress::DEFAULT_PRINT_EVERY,
            token: CancellationToken::new(),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_print_every(mut self, print_every: u32) -> Self {
        self.print_every = print_every;
        self
    }

    /// Run until the token trips. Stopping this way is the normal end of a
    /// realtime session and does not mark the summary as interrupted.
    pub fn run(&self) -> Result<RunSummary, ShrinkError> {
        info!("{} in realtime; press Ctrl-C to stop", self.job.transform().description());
        let (sender, receiver) = unbounded::<PathBuf>();
        let watcher = ReadsFolder::new(self.watch.clone()).spawn(sender, self.token.clone())?;

        let progress = Progress::new(self.print_every);
        let results = WorkerPool::new(self.threads).run_stream(receiver, &self.token, |path| {
            let result = self.job.process(&path, &self.token);
            match &result {
                Ok(_) => progress.tick(),
                Err(FileError::Cancelled) => {}
                Err(e) => error!("Failed to process {}: {}", path.display(), e),
            }
            (path, result)
        });
        let watched = watcher.join();
        let queued = queued_count(&watched);

        let mut summary = RunSummary::collect(queued, results);
        if watched.is_err() {
            for root in &self.watch.roots {
                summary
                    .failures
                    .push((root.clone(), "watcher thread panicked".to_string()));
            }
        }
        summary.pre_size = summary.outcomes.iter().map(|o| o.size_before).sum();
        summary.reverted = self.job.transform().is_revert();
        summary.interrupted = false;
        Ok(summary)
    }
}

fn queued_count(watched: &thread::Result<usize>) -> usize {
    match watched {
        Ok(queued) => *queued,
        Err(_) => {
            error!("Watcher thread panicked");
            0
        }
    }
}
