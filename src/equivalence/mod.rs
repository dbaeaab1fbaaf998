//! Structural and value comparison of two containers.
//!
//! Two containers are equivalent when they hold the same groups and datasets,
//! the same attributes with the same values, and datasets with the same fields
//! and element values. Storage types and compression are not compared:
//! integers compare numerically across widths, floats by bit pattern and byte
//! strings without their NUL padding.

use std::path::Path;

use log::{info, warn};

pub use report::{EquivalenceReport, Mismatch, Side};

mod report;

use crate::container::{read_tree, Column, ContainerError, DatasetValue, NodeId, Tree};

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Every difference between two trees, in depth-first order
pub fn compare_trees(first: &Tree, second: &Tree) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    compare_node(first, first.root(), second, second.root(), "/", &mut mismatches);
    mismatches
}

fn compare_node(a: &Tree, a_id: NodeId, b: &Tree, b_id: NodeId, path: &str, out: &mut Vec<Mismatch>) {
    compare_attrs(a, a_id, b, b_id, path, out);

    match (a.dataset_by_id(a_id), b.dataset_by_id(b_id)) {
        (Some(x), Some(y)) => compare_values(&x.value, &y.value, path, out),
        (None, None) => {
            for child in a.children(a_id) {
                let name = a.name(child).unwrap_or_default();
                let sub = child_path(path, name);
                match b.child(b_id, name) {
                    Some(other) => compare_node(a, child, b, other, &sub, out),
                    None => out.push(Mismatch::Missing {
                        path: sub,
                        from: Side::Second,
                    }),
                }
            }
            for child in b.children(b_id) {
                let name = b.name(child).unwrap_or_default();
                if a.child(a_id, name).is_none() {
                    out.push(Mismatch::Missing {
                        path: child_path(path, name),
                        from: Side::First,
                    });
                }
            }
        }
        _ => out.push(Mismatch::KindDiffers {
            path: path.to_string(),
        }),
    }
}

fn compare_attrs(a: &Tree, a_id: NodeId, b: &Tree, b_id: NodeId, path: &str, out: &mut Vec<Mismatch>) {
    let (Some(x), Some(y)) = (a.attrs(a_id), b.attrs(b_id)) else {
        return;
    };
    for (name, value) in x.iter() {
        match y.get(name) {
            Some(other) if value.same_value(other) => {}
            Some(other) => out.push(Mismatch::AttributeValue {
                path: path.to_string(),
                name: name.to_string(),
                first: value.to_string(),
                second: other.to_string(),
            }),
            None => out.push(Mismatch::AttributeMissing {
                path: path.to_string(),
                name: name.to_string(),
                from: Side::Second,
            }),
        }
    }
    for name in y.names() {
        if !x.contains(name) {
            out.push(Mismatch::AttributeMissing {
                path: path.to_string(),
                name: name.to_string(),
                from: Side::First,
            });
        }
    }
}

fn compare_values(a: &DatasetValue, b: &DatasetValue, path: &str, out: &mut Vec<Mismatch>) {
    if a.len() != b.len() {
        out.push(Mismatch::Shape {
            path: path.to_string(),
            first: a.len(),
            second: b.len(),
        });
        return;
    }

    if !a.is_compound() && !b.is_compound() {
        compare_columns(&a.fields()[0].column, &b.fields()[0].column, path, None, out);
        return;
    }

    for field in a.fields() {
        let name = field.name.clone().unwrap_or_default();
        match b.field(&name) {
            Some(other) => compare_columns(&field.column, other, path, Some(&name), out),
            None => out.push(Mismatch::FieldMissing {
                path: path.to_string(),
                field: name,
                from: Side::Second,
            }),
        }
    }
    for field in b.fields() {
        let name = field.name.clone().unwrap_or_default();
        if a.field(&name).is_none() {
            out.push(Mismatch::FieldMissing {
                path: path.to_string(),
                field: name,
                from: Side::First,
            });
        }
    }
}

fn compare_columns(a: &Column, b: &Column, path: &str, field: Option<&str>, out: &mut Vec<Mismatch>) {
    for row in 0..a.len().min(b.len()) {
        let (x, y) = (a.get(row), b.get(row));
        if x != y {
            out.push(Mismatch::Element {
                path: path.to_string(),
                field: field.map(str::to_string),
                row,
                first: x.to_string(),
                second: y.to_string(),
            });
        }
    }
}

/// Compare two container files
pub fn check_equivalent(first: &Path, second: &Path) -> Result<EquivalenceReport, ContainerError> {
    info!("Checking {} against {}", first.display(), second.display());
    let a = read_tree(first)?;
    let b = read_tree(second)?;

    let mut report = EquivalenceReport::new(first.display().to_string(), second.display().to_string());
    report.mismatches = compare_trees(&a, &b);
    for mismatch in &report.mismatches {
        warn!("Failure: {}", mismatch);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{AttrValue, Compression, Dataset};

    fn sample() -> Tree {
        let mut tree = Tree::new();
        tree.create_dataset(
            "/Raw/Reads/Read_1/Signal",
            Dataset::new(DatasetValue::single(Column::I16(vec![1, 2, 3])), Compression::None),
        )
        .unwrap();
        tree.create_dataset(
            "/Analyses/Basecall_1D_000/BaseCalled_template/Events",
            Dataset::new(
                DatasetValue::compound([
                    ("start", Column::F64(vec![10.0, 10.1])),
                    ("move", Column::I64(vec![0, 1])),
                ])
                .unwrap(),
                Compression::None,
            ),
        )
        .unwrap();
        tree.set_attr("/Raw/Reads/Read_1", "read_number", AttrValue::int(1)).unwrap();
        tree
    }

    #[test]
    fn test_identical_trees() {
        assert!(compare_trees(&sample(), &sample()).is_empty());
    }

    #[test]
    fn test_widths_and_compression_ignored() {
        let a = sample();
        let mut b = sample();
        let signal = b.dataset_mut("/Raw/Reads/Read_1/Signal").unwrap();
        signal.value = DatasetValue::single(Column::U8(vec![1, 2, 3]));
        signal.compression = Compression::max();
        b.set_attr("/Raw/Reads/Read_1", "read_number", AttrValue::uint(1)).unwrap();
        assert!(compare_trees(&a, &b).is_empty());
    }

    #[test]
    fn test_missing_nodes_both_ways() {
        let a = sample();
        let mut b = sample();
        b.remove("/Raw").unwrap();
        b.create_group("/Extra").unwrap();
        let mismatches = compare_trees(&a, &b);
        assert_eq!(
            mismatches,
            vec![
                Mismatch::Missing {
                    path: "/Raw".to_string(),
                    from: Side::Second
                },
                Mismatch::Missing {
                    path: "/Extra".to_string(),
                    from: Side::First
                },
            ]
        );
    }

    #[test]
    fn test_element_and_attribute_differences() {
        let a = sample();
        let mut b = sample();
        b.dataset_mut("/Analyses/Basecall_1D_000/BaseCalled_template/Events")
            .unwrap()
            .value = DatasetValue::compound([
            ("start", Column::F64(vec![10.0, 10.2])),
            ("move", Column::I64(vec![0, 1])),
        ])
        .unwrap();
        b.set_attr("/Raw/Reads/Read_1", "read_number", AttrValue::int(2)).unwrap();
        b.set_attr("/Raw/Reads/Read_1", "extra", AttrValue::int(2)).unwrap();

        let mismatches = compare_trees(&a, &b);
        assert_eq!(mismatches.len(), 3);
        assert!(mismatches.iter().any(|m| matches!(m, Mismatch::Element { row: 1, .. })));
        assert!(mismatches.iter().any(|m| matches!(m, Mismatch::AttributeValue { .. })));
        assert!(mismatches.iter().any(|m| matches!(m, Mismatch::AttributeMissing { from: Side::First, .. })));
    }

    #[test]
    fn test_shape_and_fields() {
        let a = sample();
        let mut b = sample();
        b.dataset_mut("/Raw/Reads/Read_1/Signal").unwrap().value =
            DatasetValue::single(Column::I16(vec![1, 2]));
        b.dataset_mut("/Analyses/Basecall_1D_000/BaseCalled_template/Events")
            .unwrap()
            .value = DatasetValue::compound([
            ("start", Column::F64(vec![10.0, 10.1])),
            ("weights", Column::F64(vec![0.5, 0.5])),
        ])
        .unwrap();
        let mismatches = compare_trees(&a, &b);
        assert!(mismatches.contains(&Mismatch::Shape {
            path: "/Raw/Reads/Read_1/Signal".to_string(),
            first: 3,
            second: 2
        }));
        assert_eq!(
            mismatches
                .iter()
                .filter(|m| matches!(m, Mismatch::FieldMissing { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_report_rendering() {
        let mut report = EquivalenceReport::new("a.fast5", "b.fast5");
        assert!(report.to_string().contains("Files are equivalent"));
        report.mismatches.push(Mismatch::Missing {
            path: "/Raw".to_string(),
            from: Side::Second,
        });
        let text = report.to_string();
        assert!(text.contains("/Raw missing from file 2"));
        assert!(text.contains("1 mismatches found"));
    }
}
