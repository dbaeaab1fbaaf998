//! Lossless compression: event tables and raw signal re-stored in minimal
//! types at the strongest gzip level, and back at the fastest one.

use log::debug;

use crate::container::{Compression, Tree};
use crate::locate::{DatasetQuery, GroupFilter, Keyword};
use crate::rewrite::{rewrite_dataset, RewriteOptions};

use super::TransformError;

/// Analysis datasets rewritten by the lossless transforms
pub const EVENT_KEYWORDS: [&str; 2] = ["Events", "Alignment"];

/// Raw signal datasets, located under [`RAW_ENTRY_POINT`]
pub const SIGNAL_KEYWORD: &str = "Signal";
pub const RAW_ENTRY_POINT: &str = "Raw";

/// Datasets touched by the lossless transforms
pub fn targets(tree: &Tree, group: &GroupFilter) -> Vec<String> {
    let mut paths = DatasetQuery::new(Keyword::any_of(EVENT_KEYWORDS))
        .with_group(group.clone())
        .find(tree);
    paths.extend(
        DatasetQuery::new(Keyword::substring(SIGNAL_KEYWORD))
            .with_entry_point(RAW_ENTRY_POINT)
            .find(tree),
    );
    paths
}

fn rewrite_all(tree: &mut Tree, group: &GroupFilter, compression: Compression) -> Result<Compression, TransformError> {
    let paths = targets(tree, group);
    let mut rewritten = 0;
    for path in &paths {
        if rewrite_dataset(tree, path, RewriteOptions::new(compression))? {
            rewritten += 1;
        }
    }
    debug!("Rewrote {} datasets with {}", rewritten, compression);
    Ok(compression)
}

pub fn compress(tree: &mut Tree, group: &GroupFilter) -> Result<Compression, TransformError> {
    rewrite_all(tree, group, Compression::max())
}

pub fn decompress(tree: &mut Tree, group: &GroupFilter) -> Result<Compression, TransformError> {
    rewrite_all(tree, group, Compression::fast())
}
