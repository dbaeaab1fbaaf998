//! Polling watcher for folders a sequencer is still writing into.
//!
//! Each scan walks the watched roots and yields the `.fast5` files not seen
//! before. A file is yielded once, however many scans see it.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{tick, Sender};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::runner::{is_fast5, CancellationToken};

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub roots: Vec<PathBuf>,
    pub poll_interval: Duration,
    /// Ignore files lying directly in a root
    pub skip_root: bool,
    /// Ignore files whose name starts with `<prefix>.`
    pub ignore_prefix: Option<String>,
}

impl WatchConfig {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            poll_interval: Duration::from_millis(Self::DEFAULT_POLL_INTERVAL_MS),
            skip_root: false,
            ignore_prefix: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_skip_root(mut self, skip_root: bool) -> Self {
        self.skip_root = skip_root;
        self
    }

    pub fn with_ignore_prefix(mut self, prefix: Option<String>) -> Self {
        self.ignore_prefix = prefix.filter(|p| !p.is_empty());
        self
    }
}

/// Watched folders and the files already handed out.
///
/// Watching is one-shot: a path is yielded at most once per session, even if
/// it changes afterwards or its job fails. A read the sequencer was still
/// writing when it was queued has to be shrunk again in batch mode.
pub struct ReadsFolder {
    config: WatchConfig,
    seen: HashSet<PathBuf>,
}

impl ReadsFolder {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.config.roots
    }

    fn ignored(&self, path: &Path) -> bool {
        let Some(prefix) = &self.config.ignore_prefix else {
            return false;
        };
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&format!("{}.", prefix)))
    }

    /// Files that appeared since the previous scan, sorted
    pub fn scan(&mut self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.config.roots {
            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Skipping entry under {}: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_fast5(entry.path()) {
                    continue;
                }
                if self.config.skip_root && entry.depth() == 1 {
                    continue;
                }
                if self.ignored(entry.path()) {
                    continue;
                }
                found.push(entry.into_path());
            }
        }
        found.sort();
        found.dedup();
        found.retain(|path| self.seen.insert(path.clone()));
        found
    }

    /// Scan every poll interval on a background thread, sending new files to
    /// `queue` until `token` trips or the receiver goes away. The thread
    /// returns how many files it queued.
    pub fn spawn(mut self, queue: Sender<PathBuf>, token: CancellationToken) -> io::Result<JoinHandle<usize>> {
        thread::Builder::new()
            .name("poreshrink-watch".to_string())
            .spawn(move || {
                for root in self.roots() {
                    info!("Watching {}", root.display());
                }
                let ticker = tick(self.config.poll_interval);
                let mut queued = 0;
                'watch: loop {
                    for path in self.scan() {
                        debug!("Queued {}", path.display());
                        if queue.send(path).is_err() {
                            warn!("Job queue closed, stopping watcher");
                            break 'watch;
                        }
                        queued += 1;
                    }
                    if token.is_cancelled() || ticker.recv().is_err() || token.is_cancelled() {
                        break;
                    }
                }
                debug!("Watcher queued {} files", queued);
                queued
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_each_file_seen_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.fast5"), b"").unwrap();
        let mut folder = ReadsFolder::new(WatchConfig::new(vec![dir.path().to_path_buf()]));

        assert_eq!(folder.scan(), vec![dir.path().join("a.fast5")]);
        assert!(folder.scan().is_empty());

        fs::write(dir.path().join("b.fast5"), b"").unwrap();
        fs::write(dir.path().join("b.fast5.tmp"), b"").unwrap();
        assert_eq!(folder.scan(), vec![dir.path().join("b.fast5")]);
    }

    #[test]
    fn test_rewritten_file_not_requeued() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.fast5");
        fs::write(&path, b"partial").unwrap();
        let mut folder = ReadsFolder::new(WatchConfig::new(vec![dir.path().to_path_buf()]));
        assert_eq!(folder.scan(), vec![path.clone()]);

        fs::write(&path, b"partial and finished").unwrap();
        assert!(folder.scan().is_empty());
    }

    #[test]
    fn test_skip_root_and_prefix() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("0")).unwrap();
        fs::write(dir.path().join("landing.fast5"), b"").unwrap();
        fs::write(dir.path().join("0/read.fast5"), b"").unwrap();
        fs::write(dir.path().join("0/copy.read.fast5"), b"").unwrap();

        let config = WatchConfig::new(vec![dir.path().to_path_buf()])
            .with_skip_root(true)
            .with_ignore_prefix(Some("copy".to_string()));
        let mut folder = ReadsFolder::new(config);
        assert_eq!(folder.scan(), vec![dir.path().join("0/read.fast5")]);

        fs::write(dir.path().join("later.fast5"), b"").unwrap();
        assert!(folder.scan().is_empty());
    }
}
