// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Run configuration: command line values layered over an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::hooks::Hooks;
use crate::nodes::DEFAULT_NODES_FILE;

pub const DEFAULT_SLEEPTIME_SECS: u64 = 60;
pub const DEFAULT_LIFETIME_SECS: u64 = 3600;
pub const DEFAULT_GRACE_MS: u64 = 5000;

/// One layer of settings. Unset fields fall through to the next layer.
///
/// The JSON config file uses exactly these keys, e.g.
/// `{"username": "alice", "sleeptime": 120, "resubmission_command": "./resubmit.sh"}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub username: Option<String>,
    pub sleeptime: Option<u64>,
    pub lifetime: Option<u64>,
    pub nodes_file: Option<PathBuf>,
    pub post_processing_command: Option<String>,
    pub completion_check_command: Option<String>,
    pub resubmission_command: Option<String>,
    pub resurrection_command: Option<String>,
}

impl Settings {
    /// Read a JSON settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Fill unset fields from `lower`
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            username: self.username.or(lower.username),
            sleeptime: self.sleeptime.or(lower.sleeptime),
            lifetime: self.lifetime.or(lower.lifetime),
            nodes_file: self.nodes_file.or(lower.nodes_file),
            post_processing_command: self.post_processing_command.or(lower.post_processing_command),
            completion_check_command: self.completion_check_command.or(lower.completion_check_command),
            resubmission_command: self.resubmission_command.or(lower.resubmission_command),
            resurrection_command: self.resurrection_command.or(lower.resurrection_command),
        }
    }

    fn hooks(&mut self) -> Hooks {
        Hooks {
            post_processing_command: self.post_processing_command.take(),
            completion_check_command: self.completion_check_command.take(),
            resubmission_command: self.resubmission_command.take(),
            resurrection_command: self.resurrection_command.take(),
        }
    }
}

/// Fully resolved and validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Empty means the invoking user
    pub username: String,
    pub sleep_interval: Duration,
    pub lifetime: Duration,
    pub grace: Duration,
    pub nodes_file: PathBuf,
    pub hooks: Hooks,
}

impl Config {
    /// Apply defaults to unset fields and validate
    pub fn resolve(mut settings: Settings, grace_ms: u64) -> Result<Self> {
        let sleeptime = settings.sleeptime.unwrap_or(DEFAULT_SLEEPTIME_SECS);
        if sleeptime == 0 {
            bail!("sleeptime must be greater than zero");
        }

        let hooks = settings.hooks();
        Ok(Self {
            username: settings.username.unwrap_or_default(),
            sleep_interval: Duration::from_secs(sleeptime),
            lifetime: Duration::from_secs(settings.lifetime.unwrap_or(DEFAULT_LIFETIME_SECS)),
            grace: Duration::from_millis(grace_ms),
            nodes_file: settings
                .nodes_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NODES_FILE)),
            hooks,
        })
    }
}
