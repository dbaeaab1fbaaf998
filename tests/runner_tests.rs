//! Batch runs over directories of demo reads

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use poreshrink::demo::write_synthetic_reads;
use poreshrink::equivalence::check_equivalent;
use poreshrink::error::ShrinkError;
use poreshrink::locate::GroupFilter;
use poreshrink::repack::ArchiveRepacker;
use poreshrink::runner::{
    find_fast5, CancellationToken, Confirm, FileJob, RunConfig, Runner, SelfTest, TEST_PREFIX,
};
use poreshrink::transform::{Mode, RawCompressionPolicy, Transform};
use tempfile::tempdir;

struct Decline;

impl Confirm for Decline {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

fn config(dir: &Path, threads: usize) -> RunConfig {
    RunConfig {
        inputs: vec![dir.to_path_buf()],
        threads,
        assume_yes: true,
        skip_root: false,
        print_every: 0,
    }
}

fn job(mode: Mode, revert: bool) -> FileJob {
    let transform = Transform::select(mode, revert, RawCompressionPolicy::default(), GroupFilter::All).unwrap();
    FileJob::new(transform, Arc::new(ArchiveRepacker))
}

fn total_size(paths: &[PathBuf]) -> u64 {
    paths.iter().map(|p| fs::metadata(p).unwrap().len()).sum()
}

/// Demo reads in `<dir>/reads` and their backups in `<dir>/orig`
fn reads(dir: &Path, count: usize) -> (PathBuf, Vec<PathBuf>) {
    let reads = dir.join("reads");
    let paths = write_synthetic_reads(&reads, count, 11).unwrap();
    let orig = dir.join("orig");
    fs::create_dir_all(&orig).unwrap();
    for path in &paths {
        fs::copy(path, orig.join(path.file_name().unwrap())).unwrap();
    }
    (reads, paths)
}

fn backup(dir: &Path, path: &Path) -> PathBuf {
    dir.join("orig").join(path.file_name().unwrap())
}

#[test]
fn test_sequential_batch_sizes() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 5);
    let before = total_size(&paths);

    let summary = Runner::new(config(&reads, 1), job(Mode::Lossless, false)).run().unwrap();
    assert_eq!(summary.files, 5);
    assert_eq!(summary.processed(), 5);
    assert!(summary.is_success());
    assert_eq!(summary.pre_size, before);
    assert_eq!(summary.post_size(), total_size(&paths));
    assert!(!summary.reverted);

    let outcome_paths: Vec<PathBuf> = summary.outcomes.iter().map(|o| o.path.clone()).collect();
    assert_eq!(outcome_paths, paths);
    assert!(summary.size_report().to_string().starts_with("Original size:"));
}

#[test]
fn test_threaded_deep_round_trip() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 6);

    let forward = Runner::new(config(&reads, 4), job(Mode::DeepLossless, false)).run().unwrap();
    assert_eq!(forward.processed(), 6);
    let reverted = Runner::new(config(&reads, 4), job(Mode::DeepLossless, true)).run().unwrap();
    assert_eq!(reverted.processed(), 6);
    assert!(reverted.reverted);
    assert!(reverted.size_report().to_string().contains("Reverted size:"));

    for path in &paths {
        let report = check_equivalent(&backup(dir.path(), path), path).unwrap();
        assert!(report.is_equivalent(), "{}", report);
    }
}

#[test]
fn test_prefix_batch() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 3);
    let before: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    let job = job(Mode::Lossless, false).with_prefix(Some("small".to_string()));
    let summary = Runner::new(config(&reads, 2), job).run().unwrap();
    assert_eq!(summary.processed(), 3);

    for (path, bytes) in paths.iter().zip(&before) {
        assert_eq!(&fs::read(path).unwrap(), bytes);
        let name = format!("small.{}", path.file_name().unwrap().to_string_lossy());
        assert!(reads.join(name).exists());
    }
}

#[test]
fn test_cancelled_before_start() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 3);
    let before: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    let token = CancellationToken::new();
    token.cancel();
    let summary = Runner::new(config(&reads, 1), job(Mode::Lossless, false))
        .with_token(token)
        .run()
        .unwrap();
    assert_eq!(summary.processed(), 0);
    assert!(summary.interrupted);
    assert!(!summary.is_success());
    for (path, bytes) in paths.iter().zip(&before) {
        assert_eq!(&fs::read(path).unwrap(), bytes);
    }
}

#[test]
fn test_declined_confirmation() {
    let dir = tempdir().unwrap();
    let (reads, _) = reads(dir.path(), 1);
    let mut config = config(&reads, 1);
    config.assume_yes = false;

    let result = Runner::new(config, job(Mode::Lossless, false))
        .with_confirm(Box::new(Decline))
        .run();
    assert!(matches!(result, Err(ShrinkError::Cancelled)));
}

#[test]
fn test_corrupt_file_is_isolated() {
    let dir = tempdir().unwrap();
    let (reads, _) = reads(dir.path(), 4);
    fs::write(reads.join("read_0000.fast5"), b"garbage").unwrap();

    let summary = Runner::new(config(&reads, 3), job(Mode::Lossless, false)).run().unwrap();
    assert_eq!(summary.files, 5);
    assert_eq!(summary.processed(), 4);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, reads.join("read_0000.fast5"));
    assert!(!summary.is_success());
}

#[test]
fn test_skip_root() {
    let dir = tempdir().unwrap();
    let (reads, _) = reads(dir.path(), 2);
    write_synthetic_reads(&reads.join("0"), 1, 3).unwrap();

    let mut config = config(&reads, 1);
    config.skip_root = true;
    let runner = Runner::new(config, job(Mode::Lossless, false));
    assert_eq!(runner.files(), vec![reads.join("0").join("read_0001.fast5")]);
}

#[test]
fn test_self_test_passes() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 3);
    let before: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();

    let test = SelfTest::new(config(&reads, 2), Mode::DeepLossless, GroupFilter::All, Arc::new(ArchiveRepacker))
        .unwrap();
    let summary = test.run().unwrap();
    assert_eq!(summary.files, 3);
    assert_eq!(summary.mismatches, 0);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.exit_code(), 0);

    for (path, bytes) in paths.iter().zip(&before) {
        assert_eq!(&fs::read(path).unwrap(), bytes);
    }
    let leftovers: Vec<PathBuf> = find_fast5(&[reads.clone()], false)
        .into_iter()
        .filter(|p| p.to_string_lossy().contains(TEST_PREFIX))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
    assert!(fs::read_dir(&reads).unwrap().all(|e| !e.unwrap().path().to_string_lossy().ends_with(".tmp")));
}

#[test]
fn test_self_test_rejects_raw() {
    let dir = tempdir().unwrap();
    let result = SelfTest::new(config(dir.path(), 1), Mode::Raw, GroupFilter::All, Arc::new(ArchiveRepacker));
    assert!(matches!(result, Err(ShrinkError::Unsupported(_))));
}

#[test]
fn test_rename_batch() {
    let dir = tempdir().unwrap();
    let (reads, paths) = reads(dir.path(), 2);
    let transform = Transform::rename("Signal$", "RawSignal").unwrap();
    let job = FileJob::new(transform, Arc::new(ArchiveRepacker));

    let summary = Runner::new(config(&reads, 1), job).run().unwrap();
    assert_eq!(summary.processed(), 2);
    for path in &paths {
        let tree = poreshrink::container::read_tree(path).unwrap();
        assert!(tree.dataset_paths().iter().any(|p| p.ends_with("/RawSignal")));
        assert!(!tree.dataset_paths().iter().any(|p| p.ends_with("/Signal")));
    }
}
