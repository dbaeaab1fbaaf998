//! # poreshrink
//!
//! Command-line tool for shrinking nanopore read containers.
//!
//! ## Usage
//!
//! ```bash
//! # Deep lossless compression of a run folder, 8 threads
//! poreshrink shrink deep-lossless reads/ -t 8 -y
//!
//! # Undo it
//! poreshrink shrink deep-lossless reads/ --revert -y
//!
//! # Check that two containers hold the same data
//! poreshrink check a.fast5 b.fast5
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    let code = cli::dispatch(cli)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
