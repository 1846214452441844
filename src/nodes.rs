// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Set of compute nodes used by our jobs, persisted across instances.
//!
//! The file format is one node name per line without a header. It is read
//! as whitespace-delimited tokens and always rewritten as a whole.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

/// Default location of the node record, relative to the working directory
pub const DEFAULT_NODES_FILE: &str = "nodes_used.txt";

/// Node names seen so far. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: BTreeSet<String>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously saved set. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read node file {:?}", path))
            }
        };

        Ok(Self {
            nodes: content.split_whitespace().map(String::from).collect(),
        })
    }

    /// Overwrite `path` with the current set, sorted, one name per line
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = String::new();
        for node in &self.nodes {
            content.push_str(node);
            content.push('\n');
        }
        fs::write(path, content).with_context(|| format!("Failed to write node file {:?}", path))
    }

    /// Names in `observed` that are not yet part of the set
    pub fn difference<'a, I>(&self, observed: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        observed
            .into_iter()
            .filter(|n| !self.nodes.contains(*n))
            .cloned()
            .collect()
    }

    /// Union `observed` into the set, returning how many names were new
    pub fn merge<I>(&mut self, observed: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.nodes.len();
        self.nodes.extend(observed);
        self.nodes.len() - before
    }

    #[cfg(test)]
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}

impl FromIterator<String> for NodeSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
