// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Lifecycle hooks: user supplied shell commands run at fixed points.
//!
//! Hook stdout is discarded and exit codes are not acted upon; stderr is
//! inherited so hook failures show up in the batch log. Only a failure to
//! start the shell at all is reported as an error.

use std::fmt;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

/// The recognised hook points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PostProcessing,
    CompletionCheck,
    Resubmission,
    Resurrection,
}

impl Hook {
    /// Hooks run (in this order) whenever the queue drains
    pub const IDLE_SEQUENCE: [Hook; 3] = [Hook::PostProcessing, Hook::CompletionCheck, Hook::Resubmission];

    /// Configuration key for this hook
    pub fn key(self) -> &'static str {
        match self {
            Hook::PostProcessing => "post_processing_command",
            Hook::CompletionCheck => "completion_check_command",
            Hook::Resubmission => "resubmission_command",
            Hook::Resurrection => "resurrection_command",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Command strings for each hook; `None` means the hook is skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
    pub post_processing_command: Option<String>,
    pub completion_check_command: Option<String>,
    pub resubmission_command: Option<String>,
    pub resurrection_command: Option<String>,
}

impl Hooks {
    pub fn get(&self, hook: Hook) -> Option<&str> {
        let command = match hook {
            Hook::PostProcessing => &self.post_processing_command,
            Hook::CompletionCheck => &self.completion_check_command,
            Hook::Resubmission => &self.resubmission_command,
            Hook::Resurrection => &self.resurrection_command,
        };
        command.as_deref()
    }

    /// Configured idle hooks, in execution order
    pub fn idle_sequence(&self) -> impl Iterator<Item = (Hook, &str)> + '_ {
        Hook::IDLE_SEQUENCE
            .into_iter()
            .filter_map(|hook| self.get(hook).map(|cmd| (hook, cmd)))
    }
}

/// Runs hook commands
pub trait Launcher {
    /// Run to completion, discarding stdout and ignoring the exit status
    fn run(&mut self, hook: Hook, command: &str) -> Result<()>;

    /// Start without waiting; the process must be able to outlive us
    fn spawn_detached(&mut self, hook: Hook, command: &str) -> Result<()>;
}

/// Runs hooks through `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    fn shell(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }

    /// Spawn `command` in its own process group with all stdio detached
    fn spawn_detached_child(command: &str) -> Result<Child> {
        Self::shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| format!("Failed to spawn detached command: {}", command))
    }
}

impl Launcher for ShellLauncher {
    fn run(&mut self, hook: Hook, command: &str) -> Result<()> {
        tracing::info!(%hook, command, "Running hook");

        let status = Self::shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {}: {}", hook, command))?;

        tracing::debug!(%hook, %status, "Hook finished");
        Ok(())
    }

    fn spawn_detached(&mut self, hook: Hook, command: &str) -> Result<()> {
        let child = Self::spawn_detached_child(command)?;
        tracing::info!(%hook, command, pid = child.id(), "Launched detached hook");
        // Dropping the handle neither kills nor waits on the child
        drop(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_hook_keys() {
        assert_eq!(Hook::PostProcessing.key(), "post_processing_command");
        assert_eq!(Hook::CompletionCheck.key(), "completion_check_command");
        assert_eq!(Hook::Resubmission.key(), "resubmission_command");
        assert_eq!(Hook::Resurrection.to_string(), "resurrection_command");
    }

    #[test]
    fn test_idle_sequence_order_and_gaps() {
        let hooks = Hooks {
            resubmission_command: Some("resubmit".into()),
            post_processing_command: Some("post".into()),
            resurrection_command: Some("again".into()),
            ..Default::default()
        };
        let seq: Vec<_> = hooks.idle_sequence().collect();
        assert_eq!(
            seq,
            vec![(Hook::PostProcessing, "post"), (Hook::Resubmission, "resubmit")]
        );
        assert_eq!(Hooks::default().idle_sequence().count(), 0);
    }

    #[test]
    fn test_run_ignores_exit_status() {
        let mut launcher = ShellLauncher;
        assert!(launcher.run(Hook::CompletionCheck, "echo noisy; exit 3").is_ok());
    }

    #[test]
    fn test_run_inherits_stderr_and_drops_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let fds = dir.path().join("fds");
        let mut launcher = ShellLauncher;

        let command = format!(
            "echo to-stderr >&2; readlink /proc/$$/fd/1 /proc/$$/fd/2 > '{}'",
            fds.display()
        );
        launcher.run(Hook::Resubmission, &command).unwrap();

        let ours = fs::read_link("/proc/self/fd/2").unwrap();
        let content = fs::read_to_string(&fds).unwrap();
        let targets: Vec<&str> = content.lines().collect();
        assert_eq!(targets, vec!["/dev/null", ours.to_str().unwrap()]);
    }

    #[test]
    fn test_run_waits_for_completion() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");
        let mut launcher = ShellLauncher;

        launcher
            .run(Hook::PostProcessing, &format!("sleep 0.2; touch '{}'", marker.display()))
            .unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_spawn_detached_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("resurrected");
        let partial = dir.path().join("partial");
        let mut launcher = ShellLauncher;

        let start = Instant::now();
        let command = format!(
            "sleep 1; echo up > '{}' && mv '{}' '{}'",
            partial.display(),
            partial.display(),
            marker.display()
        );
        launcher.spawn_detached(Hook::Resurrection, &command).unwrap();
        assert!(start.elapsed() < Duration::from_millis(900));
        assert!(!marker.exists());

        let deadline = Instant::now() + Duration::from_secs(10);
        while !marker.exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(fs::read_to_string(&marker).unwrap(), "up\n");
    }
}
