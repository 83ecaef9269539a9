//! Target partitioning
//!
//! Splits an ordered list of work items into disjoint buckets, one per worker role
//! (`by-role`, keyword classification of each target's hint) or one per module
//! (`by-module`, grouping on the path inferred from each target's id).
//!
//! Partitioning is total: every input target lands in exactly one bucket, and an empty
//! input yields empty buckets rather than an error.

pub mod keywords;
pub mod module_path;

pub use keywords::{DEFAULT_ROLE, INTEGRATION_ROLE, PROPERTY_ROLE, UNIT_ROLE, classify};
pub use module_path::module_of;

use crate::error::{SquadError, SquadResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket for targets without module structure when others have it
pub const ROOT_MODULE: &str = "root";

/// One work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    /// Technique/category hint used for role classification
    #[serde(default)]
    pub hint: String,
}

impl Target {
    pub fn new(id: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hint: hint.into(),
        }
    }

    fn classification_text(&self) -> &str {
        if self.hint.trim().is_empty() {
            &self.id
        } else {
            &self.hint
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionMode {
    #[default]
    ByRole,
    ByModule,
}

impl fmt::Display for PartitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByRole => f.write_str("by-role"),
            Self::ByModule => f.write_str("by-module"),
        }
    }
}

impl FromStr for PartitionMode {
    type Err = SquadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by-role" | "role" => Ok(Self::ByRole),
            "by-module" | "module" => Ok(Self::ByModule),
            other => Err(SquadError::invalid_field(
                "mode",
                format!("Unknown partition mode '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Role name (by-role) or module key (by-module)
    pub key: String,
    pub targets: Vec<Target>,
}

impl Bucket {
    fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Mode the caller asked for
    pub requested: PartitionMode,
    /// Mode actually applied (by-module degrades to by-role without module structure)
    pub mode: PartitionMode,
    pub buckets: Vec<Bucket>,
}

impl Partition {
    pub fn bucket(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub fn target_count(&self) -> usize {
        self.buckets.iter().map(|b| b.targets.len()).sum()
    }

    pub fn non_empty(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(|b| !b.targets.is_empty())
    }
}

/// Partition `targets` with `mode`
pub fn partition(targets: &[Target], mode: PartitionMode) -> Partition {
    match mode {
        PartitionMode::ByRole => by_role(targets, mode),
        PartitionMode::ByModule => {
            if targets.iter().any(|t| module_of(&t.id).is_some()) {
                by_module(targets)
            } else {
                tracing::debug!("No module structure in targets, partitioning by role");
                by_role(targets, mode)
            }
        }
    }
}

fn by_role(targets: &[Target], requested: PartitionMode) -> Partition {
    let mut buckets: Vec<Bucket> = keywords::roles().into_iter().map(Bucket::empty).collect();

    for target in targets {
        let role = classify(target.classification_text());
        if let Some(bucket) = buckets.iter_mut().find(|b| b.key == role) {
            bucket.targets.push(target.clone());
        }
    }

    Partition {
        requested,
        mode: PartitionMode::ByRole,
        buckets,
    }
}

fn by_module(targets: &[Target]) -> Partition {
    let mut buckets: Vec<Bucket> = Vec::new();

    for target in targets {
        let key = module_of(&target.id).unwrap_or_else(|| ROOT_MODULE.to_string());
        match buckets.iter_mut().find(|b| b.key == key) {
            Some(bucket) => bucket.targets.push(target.clone()),
            None => buckets.push(Bucket {
                key,
                targets: vec![target.clone()],
            }),
        }
    }

    Partition {
        requested: PartitionMode::ByModule,
        mode: PartitionMode::ByModule,
        buckets,
    }
}

/// Parse targets from JSON (`[{"id": .., "hint": ..}]` or `["id", ..]`) or from plain
/// lines of `id<TAB>hint` / `id`.
pub fn parse_targets(input: &str) -> SquadResult<Vec<Target>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Full(Target),
            Bare(String),
        }

        let entries: Vec<Entry> = serde_json::from_str(trimmed)
            .map_err(|e| SquadError::invalid_field("targets", format!("Invalid targets JSON: {}", e)))?;
        return Ok(entries
            .into_iter()
            .map(|entry| match entry {
                Entry::Full(target) => target,
                Entry::Bare(id) => Target::new(id, ""),
            })
            .collect());
    }

    Ok(input
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((id, hint)) => Target::new(id.trim(), hint.trim()),
            None => Target::new(line.trim(), ""),
        })
        .collect())
}
