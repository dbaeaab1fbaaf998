use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use poreshrink::collapse::{collapse, uncollapse};
use poreshrink::container::{read_tree, write_tree, Tree};
use poreshrink::demo::{synthetic_read, DemoConfig};
use poreshrink::locate::GroupFilter;
use poreshrink::transform::{Mode, RawCompressionPolicy, Transform};
use tempfile::TempDir;

fn read_with_events(events: usize) -> Tree {
    synthetic_read(&DemoConfig {
        events,
        ..DemoConfig::default()
    })
    .unwrap()
}

fn transform(mode: Mode, revert: bool) -> Transform {
    Transform::select(mode, revert, RawCompressionPolicy::default(), GroupFilter::All).unwrap()
}

/// In-memory forward transforms by event table size
fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");

    for events in [1_000, 10_000, 50_000] {
        let tree = read_with_events(events);
        group.throughput(Throughput::Elements(events as u64));

        for mode in [Mode::Lossless, Mode::DeepLossless, Mode::Raw] {
            let forward = transform(mode, false);
            group.bench_with_input(
                BenchmarkId::new(mode.to_string(), format!("{}events", events)),
                &tree,
                |b, tree| {
                    b.iter_batched(
                        || tree.clone(),
                        |mut tree| forward.apply(&mut tree).unwrap(),
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

/// Rebuilding basecall tables from the event detection table
fn bench_deep_revert(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_revert");

    for events in [1_000, 10_000, 50_000] {
        let mut tree = read_with_events(events);
        transform(Mode::DeepLossless, false).apply(&mut tree).unwrap();
        let inverse = transform(Mode::DeepLossless, true);
        group.throughput(Throughput::Elements(events as u64));

        group.bench_with_input(BenchmarkId::from_parameter(format!("{}events", events)), &tree, |b, tree| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| inverse.apply(&mut tree).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_collapse(c: &mut Criterion) {
    let tree = read_with_events(1_000);
    c.bench_function("collapse_uncollapse", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                collapse(&mut tree).unwrap();
                uncollapse(&mut tree).unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Writing and reading back a whole archive
fn bench_archive_io(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_io");
    let temp_dir = TempDir::new().unwrap();

    for events in [1_000, 10_000] {
        let tree = read_with_events(events);
        let path = temp_dir.path().join(format!("read_{}.fast5", events));
        group.throughput(Throughput::Elements(events as u64));

        group.bench_with_input(BenchmarkId::new("write", events), &tree, |b, tree| {
            b.iter(|| write_tree(tree, &path).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("read", events), &path, |b, path| {
            b.iter(|| read_tree(path).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_forward,
    bench_deep_revert,
    bench_collapse,
    bench_archive_io
);
criterion_main!(benches);
