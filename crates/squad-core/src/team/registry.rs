//! Durable team registry
//!
//! One `config.json` per team. Every mutation is a read-modify-write performed under
//! the team's exclusive lock and persisted with write-to-temp + rename, so concurrent
//! spawns cannot lose each other's members and readers never see a torn file.

use super::types::{TeamConfig, TeamMember, TeamStatus, validate_name};
use crate::error::{SquadError, SquadResult};
use crate::layout::StorageLayout;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};

/// Per-team read/write locks
///
/// Readers (snapshots, status, aggregation) hold the read side for one pass over the
/// registry and mailboxes; registry updates and cleanup hold the write side.
#[derive(Debug, Default)]
pub struct TeamLocks {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl TeamLocks {
    fn lock_for(&self, team: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(team.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    pub async fn read(&self, team: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(team).read_owned().await
    }

    pub async fn write(&self, team: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(team).write_owned().await
    }
}

/// File-backed team registry
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    layout: StorageLayout,
    locks: Arc<TeamLocks>,
}

impl TeamRegistry {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            locks: Arc::new(TeamLocks::default()),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn locks(&self) -> &TeamLocks {
        &self.locks
    }

    pub fn exists(&self, team: &str) -> bool {
        self.layout.config_path(team).exists()
    }

    /// Create the team's storage if absent and return its registry record.
    /// Idempotent: an existing team is returned unchanged.
    pub async fn ensure_team(&self, team: &str) -> SquadResult<TeamConfig> {
        validate_name("team", team)?;
        let _guard = self.locks.write(team).await;

        if let Some(config) = self.load_unlocked(team).await? {
            return Ok(config);
        }

        for dir in [
            self.layout.team_dir(team),
            self.layout.inbox_dir(team),
            self.layout.control_dir(team),
        ] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                SquadError::io_with_path(format!("Failed to create team directory: {}", e), &dir)
            })?;
        }

        let config = TeamConfig::new(team);
        self.save_unlocked(&config).await?;
        info!(team, "Created team");
        Ok(config)
    }

    /// Load a team's registry record
    pub async fn load(&self, team: &str) -> SquadResult<TeamConfig> {
        validate_name("team", team)?;
        let _guard = self.locks.read(team).await;
        self.require_unlocked(team).await
    }

    /// Load without taking the team lock; callers hold it already
    pub(crate) async fn require_unlocked(&self, team: &str) -> SquadResult<TeamConfig> {
        self.load_unlocked(team)
            .await?
            .ok_or_else(|| SquadError::team_not_found(team))
    }

    async fn load_unlocked(&self, team: &str) -> SquadResult<Option<TeamConfig>> {
        let path = self.layout.config_path(team);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SquadError::io_with_path(
                    format!("Failed to read team registry: {}", e),
                    &path,
                ));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SquadError::json(format!("Failed to parse team registry: {}", e)))
    }

    /// Serialized read-modify-write of a team's registry record.
    ///
    /// Nothing is written when `apply` fails.
    pub async fn update<T, F>(&self, team: &str, apply: F) -> SquadResult<T>
    where
        F: FnOnce(&mut TeamConfig) -> SquadResult<T>,
    {
        validate_name("team", team)?;
        let _guard = self.locks.write(team).await;

        let mut config = self.require_unlocked(team).await?;
        let value = apply(&mut config)?;
        config.updated_at = chrono::Utc::now();
        self.save_unlocked(&config).await?;
        Ok(value)
    }

    /// Register a new member; a duplicate name is rejected, never merged.
    ///
    /// A team that is shutting down or archived accepts no new members.
    pub async fn add_member(&self, team: &str, member: TeamMember) -> SquadResult<TeamMember> {
        validate_name("member", &member.name)?;
        self.update(team, |config| {
            if matches!(config.status, TeamStatus::ShuttingDown | TeamStatus::Archived) {
                return Err(SquadError::lifecycle(team, config.status, "spawn"));
            }
            if config.member(&member.name).is_some() {
                return Err(SquadError::duplicate_member(team, &member.name));
            }
            config.members.push(member.clone());
            Ok(member)
        })
        .await
    }

    async fn save_unlocked(&self, config: &TeamConfig) -> SquadResult<()> {
        let path = self.layout.config_path(&config.name);
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| SquadError::json(format!("Failed to serialize team registry: {}", e)))?;

        match write_atomic(&path, &json).await {
            Err(e) if e.is_retryable() => {
                warn!(team = %config.name, "Retrying registry write after: {}", e);
                write_atomic(&path, &json).await
            }
            other => other,
        }?;

        debug!(team = %config.name, members = config.members.len(), "Saved team registry");
        Ok(())
    }

    /// Discover every team under the teams directory
    pub async fn list(&self) -> SquadResult<Vec<TeamConfig>> {
        let mut teams = Vec::new();
        let root = self.layout.teams_dir();

        if !root.exists() {
            return Ok(teams);
        }

        let mut entries = fs::read_dir(root)
            .await
            .map_err(|e| SquadError::io(format!("Failed to read teams directory: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SquadError::io(format!("Failed to read entry: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            match self.load_unlocked(&name).await {
                Ok(Some(config)) => teams.push(config),
                Ok(None) => debug!(team = %name, "Directory without registry, skipping"),
                Err(e) => warn!(team = %name, "Unreadable team registry: {}", e),
            }
        }

        teams.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(teams)
    }

    /// Remove a team's storage.
    ///
    /// The directory is first renamed to a hidden tombstone, which is atomic, so any
    /// observer sees the team either fully present or fully absent.
    pub async fn remove(&self, team: &str) -> SquadResult<()> {
        let _guard = self.locks.write(team).await;
        self.remove_unlocked(team).await
    }

    pub(crate) async fn remove_unlocked(&self, team: &str) -> SquadResult<()> {
        let dir = self.layout.team_dir(team);
        if !dir.exists() {
            return Err(SquadError::team_not_found(team));
        }

        let tombstone = self.layout.tombstone_path(team);
        fs::rename(&dir, &tombstone).await.map_err(|e| {
            SquadError::io_with_path(format!("Failed to detach team directory: {}", e), &dir)
        })?;

        if let Err(e) = fs::remove_dir_all(&tombstone).await {
            warn!(
                team,
                tombstone = %tombstone.display(),
                "Team detached but tombstone not removed: {}",
                e
            );
        }

        info!(team, "Removed team storage");
        Ok(())
    }
}

async fn write_atomic(path: &Path, contents: &str) -> SquadResult<()> {
    let tmp = path.with_extension(format!("json.tmp-{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, contents)
        .await
        .map_err(|e| SquadError::io_with_path(format!("Failed to write registry: {}", e), &tmp))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(SquadError::io_with_path(
            format!("Failed to replace registry: {}", e),
            path,
        ));
    }
    Ok(())
}
