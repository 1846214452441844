// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod hooks;
mod nodes;
mod slurm;
mod vigilante;

use config::{Config, Settings, DEFAULT_GRACE_MS};
use hooks::ShellLauncher;
use slurm::Squeue;
use vigilante::RunState;

#[derive(Parser, Debug)]
#[command(name = "vigilante")]
#[command(about = "Watch a Slurm queue, record used nodes, run hooks when it drains and resurrect before the time limit")]
#[command(version)]
struct Args {
    /// Run type label (recorded in the log, otherwise unused)
    runtype: String,

    /// Slurm user whose jobs are watched (default: current user)
    #[arg(short, long)]
    username: Option<String>,

    /// Seconds to wait between checks while jobs are running [default: 60]
    #[arg(short, long)]
    sleeptime: Option<u64>,

    /// Seconds this instance lives before handing over [default: 3600]
    #[arg(short, long)]
    lifetime: Option<u64>,

    /// Command run when the queue drains, to post-process outputs
    #[arg(long)]
    post_processing_command: Option<String>,

    /// Command run after post-processing, to check completed jobs
    #[arg(long)]
    completion_check_command: Option<String>,

    /// Command run last when the queue drains, to resubmit jobs
    #[arg(long)]
    resubmission_command: Option<String>,

    /// Command launched detached at the end of the lifetime to start the next instance
    #[arg(long)]
    resurrection_command: Option<String>,

    /// File recording every node used so far [default: nodes_used.txt]
    #[arg(long)]
    nodes_file: Option<PathBuf>,

    /// JSON file with the same settings; command line values take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pause after launching the next instance, in milliseconds
    #[arg(long, hide = true, default_value_t = DEFAULT_GRACE_MS)]
    grace_ms: u64,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            username: self.username.clone(),
            sleeptime: self.sleeptime,
            lifetime: self.lifetime,
            nodes_file: self.nodes_file.clone(),
            post_processing_command: self.post_processing_command.clone(),
            completion_check_command: self.completion_check_command.clone(),
            resubmission_command: self.resubmission_command.clone(),
            resurrection_command: self.resurrection_command.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(host = %host, pid = std::process::id(), runtype = %args.runtype, "Starting vigilante");

    let settings = match &args.config {
        Some(path) => args.settings().or(Settings::from_file(path)?),
        None => args.settings(),
    };
    let config = Config::resolve(settings, args.grace_ms)?;
    let state = RunState::new(args.runtype, config);

    vigilante::run(&state, &mut Squeue::default(), &mut ShellLauncher)?;
    Ok(())
}
