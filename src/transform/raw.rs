//! Raw compression: delete analysis datasets, keeping the raw signal.

use log::{debug, info};

use crate::container::{Compression, Tree};
use crate::locate::{DatasetQuery, GroupFilter, Keyword};

use super::TransformError;

/// Datasets deleted by raw compression in every case
pub const RAW_KEYWORDS: [&str; 8] = [
    "Alignment",
    "Log",
    "Configuration",
    "HairpinAlign",
    "Calibration_Strand",
    "Hairpin_Split",
    "EventDetection",
    "Events",
];

pub const SUMMARY_KEYWORD: &str = "Summary";
pub const FASTQ_KEYWORD: &str = "BaseCalled";

/// Which analysis datasets raw compression deletes, fixed once per run
#[derive(Debug, Clone)]
pub struct RawCompressionPolicy {
    keyword: Keyword,
}

impl RawCompressionPolicy {
    /// Default keyword set, optionally keeping FASTQ and summary datasets
    pub fn new(retain_fastq: bool, retain_summary: bool) -> Self {
        let mut keywords: Vec<&str> = RAW_KEYWORDS.to_vec();
        if !retain_summary {
            keywords.push(SUMMARY_KEYWORD);
        }
        if !retain_fastq {
            keywords.push(FASTQ_KEYWORD);
        }
        Self {
            keyword: Keyword::any_of(keywords),
        }
    }

    /// A regular expression replacing the keyword set
    pub fn manual(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            keyword: Keyword::pattern(pattern)?,
        })
    }

    /// Policy from command-line options; `manual` wins over the retain flags
    pub fn from_options(retain_fastq: bool, retain_summary: bool, manual: Option<&str>) -> Result<Self, regex::Error> {
        match manual {
            Some(pattern) => Self::manual(pattern),
            None => Ok(Self::new(retain_fastq, retain_summary)),
        }
    }

    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    /// Datasets the policy deletes
    pub fn targets(&self, tree: &Tree, group: &GroupFilter) -> Vec<String> {
        DatasetQuery::new(self.keyword.clone())
            .with_group(group.clone())
            .find(tree)
    }
}

impl Default for RawCompressionPolicy {
    fn default() -> Self {
        Self::new(false, false)
    }
}

pub fn compress(tree: &mut Tree, group: &GroupFilter, policy: &RawCompressionPolicy) -> Result<Compression, TransformError> {
    let paths = policy.targets(tree, group);
    for path in &paths {
        debug!("Deleting {}", path);
        tree.remove(path)?;
    }
    info!("Deleted {} analysis datasets", paths.len());
    Ok(Compression::max())
}
