use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use std::time::Duration;

use poreshrink::error::ShrinkError;
use poreshrink::locate::GroupFilter;
use poreshrink::repack::{ArchiveRepacker, CommandRepacker, Repacker};
use poreshrink::runner::{
    CancellationToken, FileJob, Progress, RealtimeRunner, RunConfig, RunSummary, Runner, SelfTest,
};
use poreshrink::transform::{Mode, RawCompressionPolicy, Transform};
use poreshrink::watch::WatchConfig;

use super::config::Config;
use super::ShrinkArgs;

/// Flags merged over the config file
struct Settings {
    threads: usize,
    group: GroupFilter,
    prefix: Option<String>,
    print_every: u32,
    repacker: Arc<dyn Repacker>,
    poll_interval: Duration,
}

impl Settings {
    fn resolve(args: &ShrinkArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let repacker: Arc<dyn Repacker> = match args.repack_program.clone().or(config.shrink.repack_program) {
            Some(program) => Arc::new(CommandRepacker::new(program)),
            None => Arc::new(ArchiveRepacker),
        };
        let group = args
            .group
            .clone()
            .or(config.shrink.group)
            .unwrap_or_else(|| "all".to_string());
        Ok(Self {
            threads: args.threads.or(config.shrink.threads).unwrap_or(1).max(1),
            group: GroupFilter::from(group.as_str()),
            prefix: args.prefix.clone().or(config.shrink.prefix),
            print_every: args
                .print_every
                .or(config.shrink.print_every)
                .unwrap_or(Progress::DEFAULT_PRINT_EVERY),
            repacker,
            poll_interval: Duration::from_millis(
                args.poll_interval_ms
                    .or(config.watch.poll_interval_ms)
                    .unwrap_or(WatchConfig::DEFAULT_POLL_INTERVAL_MS),
            ),
        })
    }
}

pub fn run(args: ShrinkArgs, token: CancellationToken) -> Result<i32> {
    let settings = Settings::resolve(&args)?;
    let mode = Mode::from(args.mode);
    let run_config = RunConfig {
        inputs: args.inputs.clone(),
        threads: settings.threads,
        assume_yes: args.assume_yes,
        skip_root: args.skip_root,
        print_every: settings.print_every,
    };

    if args.test {
        if args.realtime {
            bail!("--test cannot be combined with --realtime");
        }
        let test = SelfTest::new(run_config, mode, settings.group, settings.repacker)?.with_token(token);
        return match test.run() {
            Ok(summary) => {
                println!(
                    "Tested {} files: {} mismatches, {} failures",
                    summary.files, summary.mismatches, summary.failures
                );
                Ok(summary.exit_code())
            }
            Err(ShrinkError::Cancelled) => {
                println!("User cancelled");
                Ok(1)
            }
            Err(e) => Err(e.into()),
        };
    }

    let policy = RawCompressionPolicy::from_options(args.fastq, args.summary, args.manual.as_deref())
        .context("Invalid --manual pattern")?;
    let transform = Transform::select(mode, args.revert, policy, settings.group)?;
    info!("{}", transform.description());
    let job = FileJob::new(transform, settings.repacker).with_prefix(settings.prefix);

    let result = if args.realtime {
        let watch = WatchConfig::new(args.inputs)
            .with_poll_interval(settings.poll_interval)
            .with_skip_root(args.skip_root);
        RealtimeRunner::new(watch, job, settings.threads)
            .with_token(token)
            .with_print_every(settings.print_every)
            .run()
    } else {
        Runner::new(run_config, job).with_token(token).run()
    };

    match result {
        Ok(summary) => Ok(report(&summary)),
        Err(ShrinkError::Cancelled) => {
            println!("User cancelled");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn report(summary: &RunSummary) -> i32 {
    if summary.files == 0 {
        println!("No files processed");
        return if summary.interrupted { 1 } else { 0 };
    }
    println!();
    println!("{}", summary.size_report());
    if !summary.failures.is_empty() {
        println!("{} of {} files failed", summary.failures.len(), summary.files);
    }
    if summary.interrupted {
        println!("Interrupted");
    }
    if summary.is_success() {
        0
    } else {
        1
    }
}
