use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::debug;
use std::path::PathBuf;

use poreshrink::runner::CancellationToken;
use poreshrink::transform::Mode;

mod check;
mod config;
mod demo;
mod rename;
mod shrink;

/// poreshrink - lossless shrinking of nanopore read containers
#[derive(Parser)]
#[command(name = "poreshrink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Compression mode
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Minimal integer types and maximum GZIP
    Lossless,
    /// Lossless, plus derived basecall columns dropped and the tree collapsed
    DeepLossless,
    /// Delete analyses, keep the raw signal (irreversible)
    Raw,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Lossless => Mode::Lossless,
            ModeArg::DeepLossless => Mode::DeepLossless,
            ModeArg::Raw => Mode::Raw,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShrinkArgs {
    /// Compression mode
    #[arg(value_enum, value_name = "MODE")]
    pub mode: ModeArg,

    /// Files or directories to process
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Revert to the original layout instead of compressing
    #[arg(long)]
    pub revert: bool,

    /// Number of worker threads
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Analysis group suffix to restrict to, e.g. 000, or "all"
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Work on copies named <PREFIX>.<name> instead of the inputs
    #[arg(long)]
    pub prefix: Option<String>,

    /// Raw mode: keep FASTQ datasets
    #[arg(long)]
    pub fastq: bool,

    /// Raw mode: keep summary datasets
    #[arg(long)]
    pub summary: bool,

    /// Raw mode: delete datasets matching this regular expression instead
    #[arg(long, value_name = "REGEX")]
    pub manual: Option<String>,

    /// Watch the inputs and process files as they appear
    #[arg(long)]
    pub realtime: bool,

    /// Ignore files lying directly in an input directory
    #[arg(long)]
    pub skip_root: bool,

    /// Round-trip copies of the inputs and report mismatches
    #[arg(long)]
    pub test: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,

    /// Print a progress dot for about one in N files (0 disables)
    #[arg(long, value_name = "N")]
    pub print_every: Option<u32>,

    /// External repack tool, called as <PROGRAM> -f <filter> <in> <out>
    #[arg(long, value_name = "PROGRAM")]
    pub repack_program: Option<PathBuf>,

    /// Realtime polling interval
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress or revert containers
    Shrink(ShrinkArgs),

    /// Rename datasets by regular expression
    Rename {
        /// Pattern matched against dataset paths
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Replacement, may refer to capture groups as $1
        #[arg(value_name = "REPLACEMENT")]
        replacement: String,

        /// Files or directories to process
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Number of worker threads
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,

        /// Do not ask for confirmation
        #[arg(short = 'y', long = "yes")]
        assume_yes: bool,

        /// Ignore files lying directly in an input directory
        #[arg(long)]
        skip_root: bool,
    },

    /// Compare two containers
    Check {
        #[arg(value_name = "FILE1")]
        first: PathBuf,

        #[arg(value_name = "FILE2")]
        second: PathBuf,
    },

    /// Write synthetic reads for trying the tool out
    Demo {
        /// Output directory
        #[arg(value_name = "DIR", default_value = "demo_reads")]
        dir: PathBuf,

        /// Number of reads
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Trip the returned token on Ctrl-C
fn interrupt_token() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler = token.clone();
    ctrlc::set_handler(move || {
        debug!("Interrupt received");
        handler.cancel();
    })
    .context("Failed to install interrupt handler")?;
    Ok(token)
}

/// Run the selected command and return the process exit code
pub fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Shrink(args) => shrink::run(args, interrupt_token()?),
        Commands::Rename {
            pattern,
            replacement,
            inputs,
            threads,
            assume_yes,
            skip_root,
        } => rename::run(pattern, replacement, inputs, threads, assume_yes, skip_root, interrupt_token()?),
        Commands::Check { first, second } => check::run(first, second),
        Commands::Demo { dir, count, seed } => demo::run(dir, count, seed),
    }
}
