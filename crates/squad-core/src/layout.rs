//! On-disk layout of team storage
//!
//! ```text
//! {teams_dir}/
//!   {team}/
//!     config.json              registry
//!     inboxes/{member}.jsonl   mailbox, appended by the teammate
//!     control/{member}.jsonl   control log, appended by the lead
//!     assignments/{member}.json
//! {archive_dir}/{team}-{timestamp}.json
//! ```

use std::path::{Path, PathBuf};

/// Resolves every path used by the registry, mailboxes and executors
#[derive(Debug, Clone)]
pub struct StorageLayout {
    teams_dir: PathBuf,
    archive_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(teams_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            teams_dir: teams_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn teams_dir(&self) -> &Path {
        &self.teams_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn team_dir(&self, team: &str) -> PathBuf {
        self.teams_dir.join(team)
    }

    pub fn config_path(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("config.json")
    }

    pub fn inbox_dir(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("inboxes")
    }

    pub fn inbox_path(&self, team: &str, member: &str) -> PathBuf {
        self.inbox_dir(team).join(format!("{}.jsonl", member))
    }

    pub fn control_dir(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("control")
    }

    pub fn control_path(&self, team: &str, member: &str) -> PathBuf {
        self.control_dir(team).join(format!("{}.jsonl", member))
    }

    pub fn assignment_dir(&self, team: &str) -> PathBuf {
        self.team_dir(team).join("assignments")
    }

    pub fn assignment_path(&self, team: &str, member: &str) -> PathBuf {
        self.assignment_dir(team).join(format!("{}.json", member))
    }

    /// Hidden sibling a team directory is renamed to before removal
    pub fn tombstone_path(&self, team: &str) -> PathBuf {
        self.teams_dir
            .join(format!(".{}.removing-{}", team, uuid::Uuid::new_v4().simple()))
    }

    /// Archive file for `team` at `at`; a non-zero `sequence` disambiguates archives
    /// written within the same second
    pub fn archive_path(
        &self,
        team: &str,
        at: chrono::DateTime<chrono::Utc>,
        sequence: u32,
    ) -> PathBuf {
        let stamp = at.format("%Y%m%dT%H%M%S");
        let name = match sequence {
            0 => format!("{}-{}.json", team, stamp),
            n => format!("{}-{}-{}.json", team, stamp, n),
        };
        self.archive_dir.join(name)
    }
}

impl From<&crate::config::SquadConfig> for StorageLayout {
    fn from(config: &crate::config::SquadConfig) -> Self {
        Self::new(config.teams_dir.clone(), config.archive_dir.clone())
    }
}
