use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::{
    config::{Config, RunTag},
    store::{FileStore, MemoryStore, RecordStore},
    updater::UpdateReport,
};

mod config;
mod facilities;
mod geometry;
mod matcher;
mod report;
mod store;
mod updater;
mod utils;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, default_value = "facilities.yaml")]
    config: PathBuf,
    /// Defaults to the current local time, e.g. 20240131_154500
    #[arg(long)]
    run_tag: Option<RunTag>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Draw lines between records sharing an identifier, for review
    Match,
    /// Move baseline records onto candidate positions
    Update {
        /// Work on in-memory copies and only write the summary
        #[arg(long)]
        dry_run: bool,
    },
}

fn update<S: RecordStore>(
    store: &mut S,
    config: &Config,
    run_tag: &RunTag,
) -> Result<UpdateReport> {
    let baseline = match &config.snapshot_workspace {
        Some(workspace) => updater::snapshot(store, &config.baseline, workspace, run_tag)
            .context("failed to snapshot baseline")?,
        None => config.baseline.clone(),
    };
    updater::run(store, &baseline, &config.candidate).context("failed to update positions")
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let run_tag = cli.run_tag.unwrap_or_else(RunTag::now);
    info!("run {run_tag}");

    let mut store = FileStore;
    match cli.command {
        Command::Match => {
            let report = matcher::run(&mut store, &config, &run_tag)
                .context("failed to match facilities")?;
            let path = config
                .output_workspace
                .join(format!("{}.md", report.dataset.name));
            report::write(&path, &report::match_summary(&report)?)?;
            println!("{}", report.matched());
        }
        Command::Update { dry_run } => {
            let report = if dry_run {
                let mut memory = MemoryStore::new();
                for source in [&config.baseline, &config.candidate] {
                    let dataset = source.dataset();
                    memory.add(dataset.clone(), store.table(&dataset)?);
                }
                update(&mut memory, &config, &run_tag)?
            } else {
                update(&mut store, &config, &run_tag)?
            };
            let path = config
                .output_workspace
                .join(format!("positions_{run_tag}.md"));
            report::write(&path, &report::update_summary(&report, dry_run)?)?;
            println!("{}", report.affected.len());
        }
    }

    Ok(())
}
