use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage compression of a dataset, and the filter descriptor handed to the
/// repack step (`GZIP=9`, `NONE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Gzip(u8),
}

impl Compression {
    pub const MAX_GZIP_LEVEL: u8 = 9;

    /// Strongest compression, used by every forward transform
    pub fn max() -> Self {
        Compression::Gzip(Self::MAX_GZIP_LEVEL)
    }

    /// Fastest compression, used by the inverse transforms
    pub fn fast() -> Self {
        Compression::Gzip(1)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "NONE"),
            Compression::Gzip(level) => write!(f, "GZIP={}", level),
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "NONE" {
            return Ok(Compression::None);
        }
        let level = upper
            .strip_prefix("GZIP=")
            .ok_or_else(|| format!("Unknown filter '{}'. Valid options: NONE, GZIP=<0-9>", s))?;
        match level.parse::<u8>() {
            Ok(level) if level <= Self::MAX_GZIP_LEVEL => Ok(Compression::Gzip(level)),
            _ => Err(format!("Invalid gzip level in '{}'", s)),
        }
    }
}
