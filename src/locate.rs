//! Finding the datasets a transform acts on.
//!
//! Analyses live under an entry point (normally `Analyses`) as one group per
//! analysis run, e.g. `Basecall_1D_000`. A query walks the runs whose names
//! match a [`GroupFilter`] and returns every dataset whose path contains the
//! query's [`Keyword`].

use std::fmt;
use std::str::FromStr;

use log::debug;
use regex::Regex;

use crate::collapse::{logical_path, BASEGROUP};
use crate::container::{segments, NodeId, Tree};

/// Default entry point of a query
pub const ANALYSES: &str = "Analyses";

/// Which analysis runs a query descends into
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupFilter {
    /// Every run
    #[default]
    All,
    /// Runs whose name ends with the suffix, e.g. `000` or `1D_001`
    Suffix(String),
}

impl GroupFilter {
    pub fn matches(&self, run: &str) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Suffix(suffix) => run.ends_with(suffix.as_str()),
        }
    }
}

impl From<&str> for GroupFilter {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            GroupFilter::All
        } else {
            GroupFilter::Suffix(s.to_string())
        }
    }
}

impl FromStr for GroupFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(GroupFilter::from(s))
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupFilter::All => write!(f, "all"),
            GroupFilter::Suffix(suffix) => write!(f, "{}", suffix),
        }
    }
}

/// What a dataset path has to contain
#[derive(Debug, Clone)]
pub enum Keyword {
    Substring(String),
    Pattern(Regex),
    AnyOf(Vec<Keyword>),
}

impl Keyword {
    pub fn substring(s: impl Into<String>) -> Self {
        Keyword::Substring(s.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Keyword::Pattern)
    }

    pub fn any_of<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Keyword::AnyOf(keywords.into_iter().map(|k| Keyword::Substring(k.into())).collect())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Keyword::Substring(s) => path.contains(s.as_str()),
            Keyword::Pattern(regex) => regex.is_match(path),
            Keyword::AnyOf(keywords) => keywords.iter().any(|k| k.matches(path)),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyword::Substring(s) => write!(f, "{}", s),
            Keyword::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            Keyword::AnyOf(keywords) => {
                let parts: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
                write!(f, "{}", parts.join("|"))
            }
        }
    }
}

/// A dataset search: keyword, run filter and entry point
#[derive(Debug, Clone)]
pub struct DatasetQuery {
    pub keyword: Keyword,
    pub group: GroupFilter,
    pub entry_point: String,
}

impl DatasetQuery {
    /// Query over every run under `Analyses`
    pub fn new(keyword: Keyword) -> Self {
        Self {
            keyword,
            group: GroupFilter::All,
            entry_point: ANALYSES.to_string(),
        }
    }

    pub fn with_group(mut self, group: GroupFilter) -> Self {
        self.group = group;
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn find(&self, tree: &Tree) -> Vec<String> {
        find_datasets(tree, &self.group, &self.keyword, &self.entry_point)
    }
}

/// Dataset paths under `entry_point` in matching runs whose path contains `keyword`.
///
/// Groups are searched depth first; a dataset is taken as soon as its path
/// matches. A missing entry point yields nothing. On a collapsed tree the
/// children of the basegroup are matched through their logical path.
pub fn find_datasets(tree: &Tree, group: &GroupFilter, keyword: &Keyword, entry_point: &str) -> Vec<String> {
    let mut found = Vec::new();

    if let Some(entry) = tree.resolve(entry_point).filter(|&id| tree.is_group_id(id)) {
        let at_root = entry == tree.root();
        for run in tree.children(entry) {
            let Some(name) = tree.name(run) else { continue };
            if at_root && name == BASEGROUP {
                continue;
            }
            if !group.matches(name) {
                continue;
            }
            if tree.is_group_id(run) {
                collect(tree, run, keyword, &mut found);
            } else {
                let path = tree.path_of(run);
                if keyword.matches(&path) {
                    found.push(path);
                }
            }
        }
    }

    if let Some(base) = tree.resolve(BASEGROUP).filter(|&id| tree.is_group_id(id)) {
        let entry = segments(entry_point);
        for child in tree.children(base) {
            if !tree.is_dataset_id(child) {
                continue;
            }
            let Some(name) = tree.name(child) else { continue };
            let logical = logical_path(name);
            let parts = segments(&logical);
            if parts.len() <= entry.len() || parts[..entry.len()] != entry[..] {
                continue;
            }
            if group.matches(parts[entry.len()]) && keyword.matches(&logical) {
                found.push(tree.path_of(child));
            }
        }
    }

    debug!("Found {} datasets matching '{}' under {}", found.len(), keyword, entry_point);
    found
}

fn collect(tree: &Tree, group: NodeId, keyword: &Keyword, found: &mut Vec<String>) {
    for child in tree.children(group) {
        if tree.is_group_id(child) {
            collect(tree, child, keyword, found);
        } else {
            let path = tree.path_of(child);
            if keyword.matches(&path) {
                found.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Column, Compression, Dataset, DatasetValue};

    fn add(tree: &mut Tree, path: &str) {
        tree.create_dataset(
            path,
            Dataset::new(DatasetValue::single(Column::U8(vec![1])), Compression::None),
        )
        .unwrap();
    }

    fn sample() -> Tree {
        let mut tree = Tree::new();
        add(&mut tree, "/Analyses/EventDetection_000/Reads/Read_1/Events");
        add(&mut tree, "/Analyses/Basecall_1D_000/BaseCalled_template/Events");
        add(&mut tree, "/Analyses/Basecall_1D_000/BaseCalled_template/Fastq");
        add(&mut tree, "/Analyses/Basecall_1D_001/BaseCalled_template/Events");
        add(&mut tree, "/Raw/Reads/Read_1/Signal");
        tree
    }

    #[test]
    fn test_keyword_over_all_runs() {
        let tree = sample();
        let found = DatasetQuery::new(Keyword::substring("Events")).find(&tree);
        assert_eq!(
            found,
            vec![
                "/Analyses/EventDetection_000/Reads/Read_1/Events",
                "/Analyses/Basecall_1D_000/BaseCalled_template/Events",
                "/Analyses/Basecall_1D_001/BaseCalled_template/Events",
            ]
        );
    }

    #[test]
    fn test_group_suffix() {
        let tree = sample();
        let found = DatasetQuery::new(Keyword::substring("Events"))
            .with_group(GroupFilter::from("001"))
            .find(&tree);
        assert_eq!(found, vec!["/Analyses/Basecall_1D_001/BaseCalled_template/Events"]);
    }

    #[test]
    fn test_entry_point() {
        let tree = sample();
        let found = DatasetQuery::new(Keyword::substring("Signal"))
            .with_entry_point("Raw")
            .find(&tree);
        assert_eq!(found, vec!["/Raw/Reads/Read_1/Signal"]);
        assert!(DatasetQuery::new(Keyword::substring("Signal")).find(&tree).is_empty());
    }

    #[test]
    fn test_missing_entry_point() {
        let tree = Tree::new();
        assert!(DatasetQuery::new(Keyword::substring("Events")).find(&tree).is_empty());
    }

    #[test]
    fn test_any_of_and_pattern() {
        let tree = sample();
        let found = DatasetQuery::new(Keyword::any_of(["Fastq", "Signal"]))
            .with_entry_point("/")
            .find(&tree);
        assert_eq!(found.len(), 2);
        let pattern = Keyword::pattern(r"Read_\d+/Events$").unwrap();
        assert_eq!(DatasetQuery::new(pattern).find(&tree).len(), 1);
    }

    #[test]
    fn test_collapsed_tree() {
        let mut tree = sample();
        crate::collapse::collapse(&mut tree).unwrap();
        let found = DatasetQuery::new(Keyword::substring("Events"))
            .with_group(GroupFilter::from("000"))
            .find(&tree);
        assert_eq!(
            found,
            vec![
                "/Picopore/Analyses.EventDetection_000.Reads.Read_1.Events",
                "/Picopore/Analyses.Basecall_1D_000.BaseCalled_template.Events",
            ]
        );
        let signal = DatasetQuery::new(Keyword::substring("Signal"))
            .with_entry_point("Raw")
            .find(&tree);
        assert_eq!(signal, vec!["/Picopore/Raw.Reads.Read_1.Signal"]);
    }

    #[test]
    fn test_group_filter_parse() {
        assert_eq!(GroupFilter::from("all"), GroupFilter::All);
        assert_eq!(GroupFilter::from("ALL"), GroupFilter::All);
        assert_eq!(GroupFilter::from("000"), GroupFilter::Suffix("000".to_string()));
    }
}
