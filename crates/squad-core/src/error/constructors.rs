//! Constructor methods for SquadError

use super::types::SquadError;

impl SquadError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an invalid input error naming the offending field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Unknown team
    pub fn team_not_found(team: &str) -> Self {
        Self::NotFound {
            message: format!("Team '{}' not found", team),
            resource_type: Some("team".to_string()),
        }
    }

    /// Unknown member of a known team
    pub fn member_not_found(team: &str, member: &str) -> Self {
        Self::NotFound {
            message: format!("Member '{}' not found in team '{}'", member, team),
            resource_type: Some("member".to_string()),
        }
    }

    /// Duplicate member registration
    pub fn duplicate_member(team: impl Into<String>, member: impl Into<String>) -> Self {
        Self::DuplicateMember {
            team: team.into(),
            member: member.into(),
        }
    }

    /// Backward or sideways lifecycle transition
    pub fn lifecycle(
        subject: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::Lifecycle {
            subject: subject.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a new executor error
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            context: None,
        }
    }

    /// Create an IO error for a specific path
    pub fn io_with_path(message: impl Into<String>, path: impl AsRef<std::path::Path>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.as_ref().display().to_string()),
            context: None,
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            context: None,
        }
    }
}
