//! Realtime watching of a folder being written into

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use poreshrink::container::{read_tree, Compression};
use poreshrink::demo::write_synthetic_reads;
use poreshrink::locate::GroupFilter;
use poreshrink::repack::{staging_path, ArchiveRepacker};
use poreshrink::runner::{CancellationToken, FileJob, RealtimeRunner};
use poreshrink::transform::{Mode, RawCompressionPolicy, Transform};
use poreshrink::watch::{ReadsFolder, WatchConfig};
use tempfile::tempdir;

const POLL: Duration = Duration::from_millis(20);

#[test]
fn test_new_file_queued_once() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("early.fast5"), b"").unwrap();

    let (sender, receiver) = unbounded();
    let token = CancellationToken::new();
    let config = WatchConfig::new(vec![dir.path().to_path_buf()]).with_poll_interval(POLL);
    let handle = ReadsFolder::new(config).spawn(sender, token.clone()).unwrap();

    assert_eq!(
        receiver.recv_timeout(Duration::from_secs(2)).unwrap(),
        dir.path().join("early.fast5")
    );

    fs::write(dir.path().join("late.fast5"), b"").unwrap();
    fs::write(dir.path().join("late.fast5.tmp"), b"").unwrap();
    assert_eq!(
        receiver.recv_timeout(Duration::from_secs(2)).unwrap(),
        dir.path().join("late.fast5")
    );
    assert!(receiver.recv_timeout(POLL * 10).is_err());

    token.cancel();
    assert_eq!(handle.join().unwrap(), 2);
}

#[test]
fn test_realtime_runner_processes_arrivals() {
    let dir = tempdir().unwrap();
    let landing = dir.path().join("reads");
    fs::create_dir_all(&landing).unwrap();

    let transform = Transform::select(Mode::Lossless, false, RawCompressionPolicy::default(), GroupFilter::All)
        .unwrap();
    let job = FileJob::new(transform, Arc::new(ArchiveRepacker));
    let token = CancellationToken::new();
    let runner = RealtimeRunner::new(
        WatchConfig::new(vec![landing.clone()])
            .with_poll_interval(POLL)
            .with_skip_root(true),
        job,
        2,
    )
    .with_token(token.clone())
    .with_print_every(0);
    let handle = thread::spawn(move || runner.run());

    let ignored = write_synthetic_reads(&landing, 1, 5).unwrap();
    let paths = write_synthetic_reads(&landing.join("0"), 2, 5).unwrap();

    // Reads are numbered per file, so match every event table rather than Read_1
    let done = |path: &std::path::Path| {
        if staging_path(path).exists() {
            return false;
        }
        let Ok(tree) = read_tree(path) else {
            return false;
        };
        let events: Vec<String> = tree
            .dataset_paths()
            .into_iter()
            .filter(|p| p.contains("/EventDetection_") && p.ends_with("/Events"))
            .collect();
        !events.is_empty()
            && events
                .iter()
                .all(|p| tree.dataset(p).map(|d| d.compression) == Some(Compression::Gzip(9)))
    };
    let deadline = Instant::now() + Duration::from_secs(30);
    while !paths.iter().all(|p| done(p)) && Instant::now() < deadline {
        thread::sleep(POLL);
    }
    assert!(paths.iter().all(|p| done(p)));
    thread::sleep(Duration::from_millis(500));
    token.cancel();

    let summary = handle.join().unwrap().unwrap();
    assert_eq!(summary.processed(), 2);
    assert!(summary.failures.is_empty());
    assert!(!summary.interrupted);
    assert!(!done(&ignored[0]));
}
