//! Property tests: collapse then uncollapse restores the hierarchy

use std::collections::BTreeSet;

use poreshrink::collapse::{collapse, is_collapsed, uncollapse};
use poreshrink::container::{AttrValue, Column, Compression, Dataset, DatasetValue, Tree};
use poreshrink::equivalence::compare_trees;
use proptest::prelude::*;

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let group = "g[a-z]{1,3}";
    let dataset = (prop::collection::vec(group, 1..4), 0..4usize, prop::collection::vec(any::<i32>(), 0..8));
    let attr = (prop::collection::vec(group, 1..3), "a[a-z]{0,3}", any::<i64>());
    (prop::collection::vec(dataset, 1..8), prop::collection::vec(attr, 0..6), any::<bool>()).prop_map(
        |(datasets, attrs, empty_group)| {
            let mut tree = Tree::new();
            for (groups, leaf, values) in datasets {
                let path = format!("/{}/d{}", groups.join("/"), leaf);
                let value = DatasetValue::single(Column::I32(values));
                let _ = tree.create_dataset(&path, Dataset::new(value, Compression::None));
            }
            for (groups, name, value) in attrs {
                let path = format!("/{}", groups.join("/"));
                let _ = tree.require_group(&path);
                let _ = tree.set_attr(&path, &name, AttrValue::int(value));
            }
            if empty_group {
                let _ = tree.create_group("/gempty/ginner");
            }
            tree
        },
    )
}

fn paths(tree: &Tree) -> (BTreeSet<String>, BTreeSet<String>) {
    (
        tree.group_paths().into_iter().collect(),
        tree.dataset_paths().into_iter().collect(),
    )
}

proptest! {
    #[test]
    fn collapse_round_trip(tree in tree_strategy()) {
        let original = tree.clone();
        let mut tree = tree;

        collapse(&mut tree).unwrap();
        prop_assert!(is_collapsed(&tree));
        prop_assert_eq!(tree.child_names("/"), vec!["Picopore".to_string()]);

        uncollapse(&mut tree).unwrap();
        prop_assert!(!is_collapsed(&tree));
        prop_assert_eq!(paths(&tree), paths(&original));
        prop_assert_eq!(compare_trees(&original, &tree), Vec::new());
    }
}
