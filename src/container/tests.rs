use super::*;

use std::fs::File;
use std::io::Write;

use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn events() -> DatasetValue {
    DatasetValue::compound([
        ("start", Column::U64(vec![100, 104, 109])),
        ("length", Column::U32(vec![4, 5, 3])),
        ("mean", Column::F64(vec![81.5, 90.25, f64::NAN])),
        ("model_state", Column::strings(["ACGTA", "CGTAC", "GTA"])),
    ])
    .unwrap()
}

fn sample_tree() -> Tree {
    let mut tree = Tree::new();
    tree.set_attr("/", "file_version", AttrValue::float(1.0)).unwrap();
    tree.create_group("/UniqueGlobalKey/channel_id").unwrap();
    tree.set_attr("/UniqueGlobalKey/channel_id", "sampling_rate", AttrValue::float(4000.0))
        .unwrap();
    tree.create_dataset(
        "/Raw/Reads/Read_1/Signal",
        Dataset::new(DatasetValue::single(Column::I16(vec![512, -3, 700])), Compression::fast()),
    )
    .unwrap();
    tree.create_dataset(
        "/Analyses/EventDetection_000/Reads/Read_1/Events",
        Dataset::new(events(), Compression::None),
    )
    .unwrap();
    tree.set_attr(
        "/Analyses/EventDetection_000",
        "name",
        AttrValue::string("MinKNOW"),
    )
    .unwrap();
    tree
}

#[test]
fn test_resolve_and_paths() {
    let tree = sample_tree();
    let id = tree.resolve("Raw/Reads/Read_1/Signal").unwrap();
    assert_eq!(tree.path_of(id), "/Raw/Reads/Read_1/Signal");
    assert!(tree.is_dataset("/Raw/Reads/Read_1/Signal"));
    assert!(tree.is_group("/Raw/Reads"));
    assert!(tree.resolve("/Raw/Missing").is_none());
    assert_eq!(tree.path_of(tree.root()), "/");
    assert_eq!(tree.child_names("/"), vec!["UniqueGlobalKey", "Raw", "Analyses"]);
}

#[test]
fn test_create_group_rejects_existing() {
    let mut tree = sample_tree();
    assert!(matches!(
        tree.create_group("/Raw/Reads"),
        Err(ContainerError::AlreadyExists(_))
    ));
    // require_group tolerates the existing group
    let id = tree.require_group("/Raw/Reads").unwrap();
    assert_eq!(tree.path_of(id), "/Raw/Reads");
    assert!(matches!(
        tree.require_group("/Raw/Reads/Read_1/Signal/x"),
        Err(ContainerError::NotAGroup(_))
    ));
}

#[test]
fn test_dataset_under_dataset_rejected() {
    let mut tree = sample_tree();
    let result = tree.create_dataset(
        "/Raw/Reads/Read_1/Signal/Extra",
        Dataset::new(DatasetValue::single(Column::I16(vec![1])), Compression::None),
    );
    match result {
        Err(ContainerError::NotAGroup(path)) => assert_eq!(path, "/Raw/Reads/Read_1/Signal"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        tree.create_group("/Raw/Reads/Read_1/Signal/Sub"),
        Err(ContainerError::NotAGroup(_))
    ));
    assert!(tree.is_dataset_id(tree.resolve("/Raw/Reads/Read_1/Signal").unwrap()));
    assert!(!tree.exists("/Raw/Reads/Read_1/Signal/Extra"));
}

#[test]
fn test_ragged_fields_rejected() {
    let result = DatasetValue::compound([
        ("start", Column::U64(vec![1, 2])),
        ("length", Column::U64(vec![1])),
    ]);
    assert!(matches!(result, Err(ContainerError::InvalidDataset(_))));
}

#[test]
fn test_move_node() {
    let mut tree = sample_tree();
    tree.move_node("/Raw/Reads/Read_1/Signal", "/Moved/Here/Signal").unwrap();
    assert!(tree.is_dataset("/Moved/Here/Signal"));
    assert!(!tree.exists("/Raw/Reads/Read_1/Signal"));

    // destination taken
    assert!(matches!(
        tree.move_node("/Moved/Here/Signal", "/UniqueGlobalKey/channel_id"),
        Err(ContainerError::AlreadyExists(_))
    ));
    // into itself
    assert!(matches!(
        tree.move_node("/Analyses", "/Analyses/Nested/Analyses"),
        Err(ContainerError::InvalidPath(_))
    ));
    assert!(!tree.exists("/Analyses/Nested"));
}

#[test]
fn test_remove_subtree() {
    let mut tree = sample_tree();
    tree.remove("/Analyses").unwrap();
    assert!(!tree.exists("/Analyses/EventDetection_000/Reads/Read_1/Events"));
    assert_eq!(tree.dataset_paths(), vec!["/Raw/Reads/Read_1/Signal"]);
    assert!(matches!(tree.remove("/Analyses"), Err(ContainerError::NotFound(_))));
}

#[test]
fn test_take_dataset_keeps_attributes() {
    let mut tree = sample_tree();
    let path = "/Analyses/EventDetection_000/Reads/Read_1/Events";
    tree.set_attr(path, "read_number", AttrValue::uint(1)).unwrap();
    let (dataset, attrs) = tree.take_dataset(path).unwrap();
    assert_eq!(dataset.value.len(), 3);
    assert_eq!(attrs.get("read_number"), Some(&AttrValue::uint(1)));
    assert!(!tree.exists(path));
}

#[test]
fn test_archive_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("read.fast5");
    let tree = sample_tree();
    write_tree(&tree, &path).unwrap();

    let container = Container::open(&path).unwrap();
    let back = container.tree();
    assert_eq!(back.dataset_paths(), tree.dataset_paths());
    assert_eq!(back.group_paths(), tree.group_paths());

    let events_path = "/Analyses/EventDetection_000/Reads/Read_1/Events";
    let restored = back.dataset(events_path).unwrap();
    assert!(restored.value.same_values(&events()));
    assert_eq!(restored.compression, Compression::None);
    assert_eq!(
        back.dataset("/Raw/Reads/Read_1/Signal").unwrap().value.fields()[0].name,
        None
    );
    assert_eq!(
        back.attr("/UniqueGlobalKey/channel_id", "sampling_rate"),
        Some(&AttrValue::float(4000.0))
    );
    assert_eq!(back.attr("/", "file_version"), Some(&AttrValue::float(1.0)));
}

#[test]
fn test_empty_dataset_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.fast5");
    let mut tree = Tree::new();
    tree.create_dataset(
        "/Analyses/Basecall_1D_000/BaseCalled_template/Events",
        Dataset::new(
            DatasetValue::compound([("start", Column::F64(vec![])), ("move", Column::I32(vec![]))])
                .unwrap(),
            Compression::max(),
        ),
    )
    .unwrap();
    tree.create_group("/Analyses/Basecall_1D_000/Configuration").unwrap();
    write_tree(&tree, &path).unwrap();

    let back = read_tree(&path).unwrap();
    let dataset = back
        .dataset("/Analyses/Basecall_1D_000/BaseCalled_template/Events")
        .unwrap();
    assert!(dataset.value.is_empty());
    assert_eq!(dataset.value.field_names(), vec!["start", "move"]);
    assert_eq!(dataset.value.field("move").unwrap().dtype(), DType::I32);
    assert!(back.is_group("/Analyses/Basecall_1D_000/Configuration"));
}

#[test]
fn test_close_commits_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("read.fast5");
    write_tree(&sample_tree(), &path).unwrap();

    let mut container = Container::open(&path).unwrap();
    container.tree_mut().remove("/Raw").unwrap();
    container.close().unwrap();

    assert!(!read_tree(&path).unwrap().exists("/Raw"));
    // only the committed file is left in the directory
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_rejects_foreign_archive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("other.fast5");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"application/vnd.other").unwrap();
    zip.finish().unwrap();

    assert!(matches!(read_tree(&path), Err(ContainerError::InvalidFormat(_))));
}

#[test]
fn test_rejects_non_archive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.fast5");
    std::fs::write(&path, b"not a container").unwrap();
    assert!(Container::open(&path).is_err());
}
