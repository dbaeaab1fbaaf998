//! Deep lossless compression of basecall event tables.
//!
//! A basecall event table repeats, for every event it kept, the `mean`,
//! `stdv` and `length` of the matching event detection row, and stores its
//! `start` as seconds. All of that can be rebuilt from the event detection
//! table once each row's sample index is known. The forward transform stores
//! only the index, as a delta against the smallest event detection start:
//!
//! ```text
//! before: mean  start  stdv  length  model_state  move ...
//! after:  start(delta)              model_state  move ...   @start_index_offset
//! ```
//!
//! The event detection table's own `start` is zero-based the same way. Every
//! table is checked to rebuild bit for bit before it is rewritten; tables that
//! would not are left to plain lossless compression.

use log::{debug, info, warn};

use crate::collapse::{collapse, uncollapse, CollapseError};
use crate::container::{normalize, segments, AttrValue, Column, Compression, DatasetValue, Field, Tree};
use crate::locate::{DatasetQuery, GroupFilter, Keyword};
use crate::minimize::{minimal_int_column, minimize_attr, TypeError};
use crate::rewrite::{rewrite_dataset, RewriteOptions};

use super::{lossless, TransformError};

/// Attribute recording the index subtracted from a `start` field
pub const START_OFFSET_ATTR: &str = "start_index_offset";

/// Attribute on a basecall group naming its event detection group
pub const EVENT_DETECTION_ATTR: &str = "event_detection";

pub const EVENT_DETECTION_KEYWORD: &str = "EventDetection";
pub const CHANNEL_ID: &str = "UniqueGlobalKey/channel_id";
pub const SAMPLING_RATE_ATTR: &str = "sampling_rate";

const EVENTS_KEYWORD: &str = "Events";
const MEAN: &str = "mean";
const START: &str = "start";
const STDV: &str = "stdv";
const LENGTH: &str = "length";
const DERIVED_FIELDS: [&str; 4] = [MEAN, START, STDV, LENGTH];

/// An event detection table and the basecall tables built from it
#[derive(Debug)]
struct EventLink {
    detection: String,
    basecalls: Vec<String>,
}

fn sampling_rate(tree: &Tree) -> Option<f64> {
    tree.attr(CHANNEL_ID, SAMPLING_RATE_ATTR).and_then(AttrValue::as_f64)
}

fn events_query() -> DatasetQuery {
    DatasetQuery::new(Keyword::substring(EVENTS_KEYWORD))
}

/// Event detection group named by the nearest ancestor below `Analyses`
fn linked_detection_group(tree: &Tree, basecall: &str) -> Option<String> {
    let parts = segments(basecall);
    (2..parts.len()).rev().find_map(|depth| {
        let ancestor = format!("/{}", parts[..depth].join("/"));
        tree.attr(&ancestor, EVENT_DETECTION_ATTR)
            .and_then(AttrValue::as_str)
            .map(|group| normalize(&group))
    })
}

fn event_links(tree: &Tree, group: &GroupFilter) -> Vec<EventLink> {
    let detections: Vec<String> = events_query()
        .find(tree)
        .into_iter()
        .filter(|p| p.contains(EVENT_DETECTION_KEYWORD))
        .collect();
    let basecalls: Vec<String> = events_query()
        .with_group(group.clone())
        .find(tree)
        .into_iter()
        .filter(|p| !p.contains(EVENT_DETECTION_KEYWORD))
        .collect();

    let mut links: Vec<EventLink> = Vec::new();
    for basecall in basecalls {
        let candidates: Vec<&String> = match linked_detection_group(tree, &basecall) {
            Some(group) => {
                let prefix = format!("{}/", group);
                detections.iter().filter(|d| d.starts_with(&prefix)).collect()
            }
            None => detections.iter().collect(),
        };
        match candidates.as_slice() {
            [detection] => match links.iter_mut().find(|l| &l.detection == *detection) {
                Some(link) => link.basecalls.push(basecall),
                None => links.push(EventLink {
                    detection: (*detection).clone(),
                    basecalls: vec![basecall],
                }),
            },
            [] => warn!("No event detection found for {}", basecall),
            many => warn!("{} event detections match {}", many.len(), basecall),
        }
    }
    links
}

fn missing_field(path: &str, field: &str) -> TransformError {
    TransformError::MissingField {
        path: path.to_string(),
        field: field.to_string(),
    }
}

fn offset_attr(offset: i128) -> Result<AttrValue, TypeError> {
    let value = AttrValue::from_i128(offset)
        .ok_or_else(|| TypeError(format!("offset {} does not fit a 64-bit type", offset)))?;
    minimize_attr(&value)
}

fn replace_field(value: &DatasetValue, name: &str, column: Column) -> Result<DatasetValue, TransformError> {
    let fields = value
        .fields()
        .iter()
        .map(|f| match f.name.as_deref() {
            Some(n) if n == name => Field::named(n, column.clone()),
            _ => f.clone(),
        })
        .collect();
    Ok(DatasetValue::from_fields(fields)?)
}

/// Basecall table with the derived fields dropped and `start` replaced by deltas
fn strip_derived(original: &DatasetValue, deltas: Column) -> Result<DatasetValue, TransformError> {
    let mut fields = vec![Field::named(START, deltas)];
    fields.extend(
        original
            .fields()
            .iter()
            .filter(|f| !f.name.as_deref().is_some_and(|n| DERIVED_FIELDS.contains(&n)))
            .cloned(),
    );
    Ok(DatasetValue::from_fields(fields)?)
}

/// Event detection row for every index, scanning forward only.
///
/// The scan starts at the first row at or after the first index and never
/// moves backwards; a row is not consumed by a match, so repeated indices map
/// to the same row. Fails with the position of the first index that has no
/// matching row.
fn align(indices: &[i128], detection_starts: &[i128]) -> Result<Vec<usize>, usize> {
    let Some(&first) = indices.first() else {
        return Ok(Vec::new());
    };
    let mut row = detection_starts
        .iter()
        .position(|&s| s >= first)
        .unwrap_or(detection_starts.len());
    let mut rows = Vec::with_capacity(indices.len());
    for (i, &index) in indices.iter().enumerate() {
        while row < detection_starts.len() && detection_starts[row] != index {
            row += 1;
        }
        if row == detection_starts.len() {
            return Err(i);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Rebuild a basecall table from its stored deltas and the absolute event
/// detection table
fn rebuild_basecall(
    stored: &DatasetValue,
    path: &str,
    detection: &DatasetValue,
    detection_path: &str,
    offset: i128,
    rate: f64,
) -> Result<DatasetValue, TransformError> {
    let indices: Vec<i128> = stored
        .field(START)
        .and_then(Column::ints)
        .ok_or_else(|| missing_field(path, START))?
        .into_iter()
        .map(|delta| delta + offset)
        .collect();
    let detection_starts = detection
        .field(START)
        .and_then(Column::ints)
        .ok_or_else(|| missing_field(detection_path, START))?;
    let rows = align(&indices, &detection_starts).map_err(|row| TransformError::Alignment {
        path: path.to_string(),
        row,
        index: indices[row],
    })?;

    let mean = detection
        .field(MEAN)
        .ok_or_else(|| missing_field(detection_path, MEAN))?
        .take(&rows);
    let stdv = detection
        .field(STDV)
        .ok_or_else(|| missing_field(detection_path, STDV))?
        .take(&rows);
    let lengths = detection
        .field(LENGTH)
        .and_then(Column::numbers)
        .ok_or_else(|| missing_field(detection_path, LENGTH))?;

    let seconds = indices.iter().map(|&index| index as f64 / rate).collect();
    let durations = rows.iter().map(|&row| lengths[row] / rate).collect();

    let mut fields = vec![
        Field::named(MEAN, mean),
        Field::named(START, Column::F64(seconds)),
        Field::named(STDV, stdv),
        Field::named(LENGTH, Column::F64(durations)),
    ];
    fields.extend(
        stored
            .fields()
            .iter()
            .filter(|f| f.name.as_deref() != Some(START))
            .cloned(),
    );
    Ok(DatasetValue::from_fields(fields)?)
}

fn shift_basecall(
    tree: &mut Tree,
    path: &str,
    detection: &DatasetValue,
    detection_path: &str,
    offset: i128,
    rate: f64,
) -> Result<bool, TransformError> {
    if tree.attr(path, START_OFFSET_ATTR).is_some() {
        debug!("{} is already re-indexed", path);
        return Ok(false);
    }
    let Some(original) = tree.dataset(path).map(|d| d.value.clone()) else {
        return Ok(false);
    };
    let Some(seconds) = original.field(START).and_then(Column::floats) else {
        warn!("{} has no floating-point start field, leaving it as is", path);
        return Ok(false);
    };
    let deltas: Vec<i128> = seconds
        .iter()
        .map(|s| (s * rate).round() as i128 - offset)
        .collect();
    let Ok(deltas) = minimal_int_column(&deltas) else {
        warn!("{} has start times outside the sample range, leaving it as is", path);
        return Ok(false);
    };
    let stored = strip_derived(&original, deltas)?;

    match rebuild_basecall(&stored, path, detection, detection_path, offset, rate) {
        Ok(rebuilt) if rebuilt.same_values(&original) => {}
        _ => {
            warn!("{} does not rebuild exactly from {}, leaving it as is", path, detection_path);
            return Ok(false);
        }
    }

    rewrite_dataset(tree, path, RewriteOptions::new(Compression::max()).with_replacement(stored))?;
    tree.set_attr(path, START_OFFSET_ATTR, offset_attr(offset)?)?;
    Ok(true)
}

fn shift_link(tree: &mut Tree, link: &EventLink, rate: f64) -> Result<usize, TransformError> {
    let path = link.detection.as_str();
    if tree.attr(path, START_OFFSET_ATTR).is_some() {
        debug!("{} is already re-indexed", path);
        return Ok(0);
    }
    let Some(detection) = tree.dataset(path).map(|d| d.value.clone()) else {
        return Ok(0);
    };
    let Some(starts) = detection.field(START).and_then(Column::ints) else {
        warn!("{} has no integer start field, leaving its basecalls as they are", path);
        return Ok(0);
    };
    let Some(&offset) = starts.iter().min() else {
        debug!("{} is empty", path);
        return Ok(0);
    };

    let mut shifted = 0;
    for basecall in &link.basecalls {
        if shift_basecall(tree, basecall, &detection, path, offset, rate)? {
            shifted += 1;
        }
    }

    let zeroed: Vec<i128> = starts.iter().map(|s| s - offset).collect();
    let value = replace_field(&detection, START, minimal_int_column(&zeroed)?)?;
    rewrite_dataset(tree, path, RewriteOptions::new(Compression::max()).with_replacement(value))?;
    tree.set_attr(path, START_OFFSET_ATTR, offset_attr(offset)?)?;
    Ok(shifted)
}

/// Forward deep lossless transform
pub fn compress(tree: &mut Tree, group: &GroupFilter) -> Result<Compression, TransformError> {
    let links = event_links(tree, group);
    if links.is_empty() {
        info!("No basecall events linked to an event detection, performing lossless compression");
        return lossless::compress(tree, group);
    }
    let Some(rate) = sampling_rate(tree) else {
        warn!(
            "No {} at /{}, performing lossless compression",
            SAMPLING_RATE_ATTR, CHANNEL_ID
        );
        return lossless::compress(tree, group);
    };

    let mut shifted = 0;
    for link in &links {
        shifted += shift_link(tree, link, rate)?;
    }
    debug!("Re-indexed {} basecall event tables", shifted);

    match collapse(tree) {
        Ok(moved) => debug!("Collapsed {} datasets", moved),
        Err(e @ (CollapseError::SeparatorInName(_) | CollapseError::Collision(_))) => {
            warn!("Keeping hierarchy: {}", e)
        }
        Err(e) => return Err(e.into()),
    }
    lossless::compress(tree, group)
}

fn restore_detection(tree: &mut Tree, path: &str) -> Result<(), TransformError> {
    let Some(offset) = tree.attr(path, START_OFFSET_ATTR).and_then(AttrValue::as_i128) else {
        return Ok(());
    };
    let Some(value) = tree.dataset(path).map(|d| d.value.clone()) else {
        return Ok(());
    };
    let absolute: Vec<i128> = value
        .field(START)
        .and_then(Column::ints)
        .ok_or_else(|| missing_field(path, START))?
        .into_iter()
        .map(|s| s + offset)
        .collect();
    let value = replace_field(&value, START, minimal_int_column(&absolute)?)?;
    rewrite_dataset(tree, path, RewriteOptions::new(Compression::fast()).with_replacement(value))?;
    tree.remove_attr(path, START_OFFSET_ATTR);
    Ok(())
}

fn is_stripped(tree: &Tree, path: &str) -> bool {
    tree.attr(path, START_OFFSET_ATTR).is_some()
        && tree.dataset(path).is_some_and(|d| d.value.field(MEAN).is_none())
}

fn restore_basecall(
    tree: &mut Tree,
    path: &str,
    detection_path: &str,
    rate: Option<f64>,
) -> Result<bool, TransformError> {
    if !is_stripped(tree, path) {
        return Ok(false);
    }
    let Some(offset) = tree.attr(path, START_OFFSET_ATTR).and_then(AttrValue::as_i128) else {
        return Ok(false);
    };
    let rate = rate.ok_or_else(|| TransformError::MissingSamplingRate(CHANNEL_ID.to_string()))?;
    let stored = tree
        .dataset(path)
        .map(|d| d.value.clone())
        .ok_or_else(|| missing_field(path, START))?;
    let detection = tree
        .dataset(detection_path)
        .map(|d| d.value.clone())
        .ok_or_else(|| TransformError::UnlinkedEvents(path.to_string()))?;

    let value = rebuild_basecall(&stored, path, &detection, detection_path, offset, rate)?;
    rewrite_dataset(tree, path, RewriteOptions::new(Compression::fast()).with_replacement(value))?;
    tree.remove_attr(path, START_OFFSET_ATTR);
    Ok(true)
}

/// Inverse deep lossless transform
pub fn decompress(tree: &mut Tree, group: &GroupFilter) -> Result<Compression, TransformError> {
    let moved = uncollapse(tree)?;
    if moved > 0 {
        debug!("Uncollapsed {} datasets", moved);
    }

    // basecall rows align against absolute indices
    for path in events_query().find(tree) {
        if path.contains(EVENT_DETECTION_KEYWORD) {
            restore_detection(tree, &path)?;
        }
    }

    let rate = sampling_rate(tree);
    let mut restored = 0;
    for link in event_links(tree, group) {
        for basecall in &link.basecalls {
            if restore_basecall(tree, basecall, &link.detection, rate)? {
                restored += 1;
            }
        }
    }
    debug!("Rebuilt {} basecall event tables", restored);

    if let Some(stranded) = events_query()
        .with_group(group.clone())
        .find(tree)
        .into_iter()
        .find(|p| is_stripped(tree, p))
    {
        return Err(TransformError::UnlinkedEvents(stranded));
    }
    lossless::decompress(tree, group)
}
