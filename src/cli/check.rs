use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use poreshrink::equivalence::check_equivalent;

/// Compare two containers; exit code 1 when they differ
pub fn run(first: PathBuf, second: PathBuf) -> Result<i32> {
    info!("Comparing {} and {}", first.display(), second.display());

    let report = check_equivalent(&first, &second).context("Failed to compare containers")?;

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }

    Ok(if report.is_equivalent() { 0 } else { 1 })
}
