//! Team and member records stored in `{teams_dir}/{team}/config.json`

use crate::error::{SquadError, SquadResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall team status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    Forming,
    Active,
    ShuttingDown,
    Archived,
}

impl TeamStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Forming => 0,
            Self::Active => 1,
            Self::ShuttingDown => 2,
            Self::Archived => 3,
        }
    }
}

impl fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Forming => "forming",
            Self::Active => "active",
            Self::ShuttingDown => "shutting_down",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Member lifecycle status
///
/// Ordered `spawning → active → {completed|failed} → shutdown_requested → shut_down`.
/// `completed` and `failed` share a rank: once one is reached the other is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Spawning,
    Active,
    Completed,
    Failed,
    ShutdownRequested,
    ShutDown,
}

impl MemberStatus {
    pub fn rank(self) -> u8 {
        match self {
            Self::Spawning => 0,
            Self::Active => 1,
            Self::Completed | Self::Failed => 2,
            Self::ShutdownRequested => 3,
            Self::ShutDown => 4,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_advance_to(self, next: MemberStatus) -> bool {
        self == next || next.rank() > self.rank()
    }

    pub fn is_terminal_result(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spawning => "spawning",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ShutdownRequested => "shutdown_requested",
            Self::ShutDown => "shut_down",
        };
        f.write_str(s)
    }
}

/// A team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    /// Unique agent ID (`{name}@{team}`)
    pub agent_id: String,
    /// Human-readable name, unique within the team (used for mailbox paths)
    pub name: String,
    /// Worker type, e.g. "unit-tester"
    pub role: String,
    /// Lifecycle status
    pub status: MemberStatus,
    /// Ids of the targets assigned to this member
    #[serde(default)]
    pub targets: Vec<String>,
    /// Reference returned by the executor when the submission was accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<String>,
    /// Join timestamp
    pub joined_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn new(team: &str, name: &str, role: &str, targets: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id(name, team),
            name: name.to_string(),
            role: role.to_string(),
            status: MemberStatus::Spawning,
            targets,
            submission: None,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, rejecting backward or sideways transitions.
    /// Returns whether the status actually changed.
    pub fn advance(&mut self, next: MemberStatus) -> SquadResult<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_advance_to(next) {
            return Err(SquadError::lifecycle(&self.agent_id, self.status, next));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }
}

/// Team registry record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Team name
    pub name: String,
    /// Team description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overall status
    pub status: TeamStatus,
    /// Team members, in spawn order
    pub members: Vec<TeamMember>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl TeamConfig {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            description: None,
            status: TeamStatus::Forming,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, name: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut TeamMember> {
        self.members.iter_mut().find(|m| m.name == name)
    }

    /// Move the team status forward; earlier statuses are left untouched
    pub fn advance(&mut self, next: TeamStatus) -> SquadResult<bool> {
        if self.status == next {
            return Ok(false);
        }
        if next.rank() < self.status.rank() {
            return Err(SquadError::lifecycle(&self.name, self.status, next));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }
}

pub fn agent_id(name: &str, team: &str) -> String {
    format!("{}@{}", name, team)
}

/// Team and member names become path components, so they are restricted to
/// `[A-Za-z0-9_-]`.
pub fn validate_name(kind: &str, value: &str) -> SquadResult<()> {
    if value.is_empty() {
        return Err(SquadError::invalid_field(
            kind,
            format!("{} name must not be empty", kind),
        ));
    }
    if value.len() > 64 {
        return Err(SquadError::invalid_field(
            kind,
            format!("{} name '{}' is longer than 64 characters", kind, value),
        ));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(SquadError::invalid_field(
            kind,
            format!("{} name '{}' contains invalid character '{}'", kind, value, bad),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [MemberStatus; 5] = [
        MemberStatus::Spawning,
        MemberStatus::Active,
        MemberStatus::Completed,
        MemberStatus::ShutdownRequested,
        MemberStatus::ShutDown,
    ];

    #[test]
    fn test_member_lifecycle_only_moves_forward() {
        for (i, from) in ORDER.iter().enumerate() {
            for (j, to) in ORDER.iter().enumerate() {
                assert_eq!(from.can_advance_to(*to), j >= i, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_completed_and_failed_are_exclusive() {
        assert!(!MemberStatus::Completed.can_advance_to(MemberStatus::Failed));
        assert!(!MemberStatus::Failed.can_advance_to(MemberStatus::Completed));
        assert!(MemberStatus::Failed.can_advance_to(MemberStatus::ShutdownRequested));
        assert!(MemberStatus::Active.can_advance_to(MemberStatus::Failed));
    }

    #[test]
    fn test_member_advance() {
        let mut member = TeamMember::new("alpha", "unit-1", "unit-tester", vec![]);
        assert_eq!(member.agent_id, "unit-1@alpha");
        assert_eq!(member.status, MemberStatus::Spawning);

        assert!(member.advance(MemberStatus::Active).unwrap());
        assert!(!member.advance(MemberStatus::Active).unwrap());
        assert!(member.advance(MemberStatus::Completed).unwrap());

        let err = member.advance(MemberStatus::Active).unwrap_err();
        assert_eq!(err.error_code(), "SQUAD_LIFECYCLE");
        assert_eq!(member.status, MemberStatus::Completed);
    }

    #[test]
    fn test_team_advance() {
        let mut team = TeamConfig::new("alpha");
        assert_eq!(team.status, TeamStatus::Forming);
        team.advance(TeamStatus::Active).unwrap();
        team.advance(TeamStatus::ShuttingDown).unwrap();
        assert!(team.advance(TeamStatus::Active).is_err());
        assert_eq!(team.status, TeamStatus::ShuttingDown);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&MemberStatus::ShutdownRequested).unwrap();
        assert_eq!(json, "\"shutdown_requested\"");
        let json = serde_json::to_string(&TeamStatus::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting_down\"");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("team", "alpha_2-b").is_ok());
        assert!(validate_name("team", "").is_err());
        assert!(validate_name("member", "../etc").is_err());
        assert!(validate_name("member", "a b").is_err());
        assert!(validate_name("member", &"x".repeat(65)).is_err());
    }
}
