// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! The polling loop.
//!
//! Each iteration takes one queue snapshot. While jobs are running the nodes
//! they occupy are recorded and the loop sleeps. Once the queue drains the
//! idle hooks run back to back. When the lifetime is used up the node record
//! is saved, the resurrection hook is launched detached and the loop returns
//! after a short grace period.
//!
//! The idle branch does not sleep. With no idle hooks configured an idle
//! queue is polled back to back until the lifetime expires.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::Config;
use crate::hooks::{Hook, Hooks, Launcher};
use crate::nodes::NodeSet;
use crate::slurm::QueueInspector;

/// Everything one instance needs, fixed at startup
#[derive(Debug, Clone)]
pub struct RunState {
    pub started: Instant,
    /// Label passed on the command line; recorded but otherwise unused
    pub runtype: String,
    pub username: String,
    pub sleep_interval: Duration,
    pub lifetime: Duration,
    pub grace: Duration,
    pub nodes_file: PathBuf,
    pub hooks: Hooks,
}

impl RunState {
    pub fn new(runtype: impl Into<String>, config: Config) -> Self {
        Self {
            started: Instant::now(),
            runtype: runtype.into(),
            username: config.username,
            sleep_interval: config.sleep_interval,
            lifetime: config.lifetime,
            grace: config.grace,
            nodes_file: config.nodes_file,
            hooks: config.hooks,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.lifetime
    }
}

/// What a finished run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub busy_polls: u64,
    pub idle_rounds: u64,
    pub hooks_run: u64,
    pub nodes: usize,
    pub resurrected: bool,
}

/// Run one instance until its lifetime is used up
pub fn run<Q, L>(state: &RunState, inspector: &mut Q, launcher: &mut L) -> Result<RunSummary>
where
    Q: QueueInspector,
    L: Launcher,
{
    tracing::info!(
        elapsed_secs = state.elapsed().as_secs_f64(),
        runtype = %state.runtype,
        "Vigilante loop starting"
    );

    let mut nodes = NodeSet::load(&state.nodes_file)?;
    if nodes.is_empty() {
        tracing::info!(file = ?state.nodes_file, "No nodes recorded yet");
    } else {
        tracing::info!(known_nodes = nodes.len(), file = ?state.nodes_file, "Loaded node record");
    }

    let mut summary = RunSummary::default();

    while !state.expired() {
        let snapshot = inspector.snapshot(&state.username)?;
        summary.polls += 1;
        tracing::debug!(lines = ?snapshot.lines(), "Queue snapshot");

        if snapshot.is_busy() {
            summary.busy_polls += 1;

            let observed = snapshot.nodes();
            let new_nodes = nodes.difference(&observed);
            if !new_nodes.is_empty() {
                tracing::info!(new = ?new_nodes, "Recording new nodes");
                nodes.merge(new_nodes);
                nodes.save(&state.nodes_file)?;
            }

            thread::sleep(state.sleep_interval);
            tracing::debug!(slept_secs = state.sleep_interval.as_secs_f64(), "Time to recheck");
            continue;
        }

        summary.idle_rounds += 1;
        for (hook, command) in state.hooks.idle_sequence() {
            launcher.run(hook, command)?;
            summary.hooks_run += 1;
        }
    }

    nodes.save(&state.nodes_file)?;
    summary.nodes = nodes.len();

    if let Some(command) = state.hooks.get(Hook::Resurrection) {
        tracing::info!("Lifetime reached, launching the next instance");
        launcher.spawn_detached(Hook::Resurrection, command)?;
        summary.resurrected = true;
    }

    // Give the successor time to start before we exit
    thread::sleep(state.grace);

    tracing::info!(
        elapsed_secs = state.elapsed().as_secs_f64(),
        polls = summary.polls,
        busy_polls = summary.busy_polls,
        idle_rounds = summary.idle_rounds,
        hooks_run = summary.hooks_run,
        nodes = summary.nodes,
        resurrected = summary.resurrected,
        "Vigilante loop finished"
    );
    Ok(summary)
}
