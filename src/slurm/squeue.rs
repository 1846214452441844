// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm CLI integration: list a user's jobs via squeue.
//!
//! A squeue that cannot be run or exits non-zero ends the instance, and no
//! successor is launched. Empty output from a failed squeue would read as an
//! idle queue and fire the resubmission hook against a scheduler that is not
//! answering, so a transient slurmctld timeout is treated as fatal as well.

use std::process::Command;

use anyhow::{anyhow, Context, Result};

/// Raw squeue output split on newlines.
///
/// A trailing newline produces a trailing empty line, so an empty queue has
/// exactly one line and a single job has two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    lines: Vec<String>,
}

impl QueueSnapshot {
    /// Split squeue stdout into lines, keeping the trailing empty one
    pub fn from_output(output: &str) -> Self {
        Self {
            lines: output.split('\n').map(String::from).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Busy means more than two lines, i.e. at least two jobs listed
    pub fn is_busy(&self) -> bool {
        self.line_count() > 2
    }

    /// Node identifiers: last token of every line except the final one.
    ///
    /// Lines with no tokens at all are skipped.
    pub fn nodes(&self) -> Vec<String> {
        let Some((_, job_lines)) = self.lines.split_last() else {
            return Vec::new();
        };
        job_lines
            .iter()
            .filter_map(|line| line.split_whitespace().last())
            .map(String::from)
            .collect()
    }
}

/// Source of queue snapshots for one user
pub trait QueueInspector {
    fn snapshot(&mut self, username: &str) -> Result<QueueSnapshot>;
}

/// Queries the real scheduler through the `squeue` binary
#[derive(Debug, Clone)]
pub struct Squeue {
    program: String,
}

impl Default for Squeue {
    fn default() -> Self {
        Self {
            program: "squeue".to_string(),
        }
    }
}

impl Squeue {
    #[cfg(test)]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the argument list; the username is never passed through a shell
    fn args(username: &str) -> Vec<String> {
        let user = if username.is_empty() {
            current_user()
        } else {
            Some(username.to_string())
        };

        match user {
            Some(user) => vec!["-h".to_string(), "-u".to_string(), user],
            None => vec!["-h".to_string(), "--me".to_string()],
        }
    }
}

impl QueueInspector for Squeue {
    fn snapshot(&mut self, username: &str) -> Result<QueueSnapshot> {
        let output = Command::new(&self.program)
            .args(Self::args(username))
            .output()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} failed ({}): {}", self.program, output.status, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(QueueSnapshot::from_output(&stdout))
    }
}

/// Login name of the invoking user, if the environment carries one
fn current_user() -> Option<String> {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
}
