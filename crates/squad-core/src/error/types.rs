//! Core error types

use thiserror::Error;

/// Result type alias for Squad operations
pub type SquadResult<T> = Result<T, SquadError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> SquadResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SquadResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> SquadResult<T> {
        self.map_err(|e| SquadError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> SquadResult<T> {
        self.map_err(|e| SquadError::other(format!("{}: {}", f(), e)))
    }
}

/// Main error type for Squad
#[derive(Error, Debug, Clone)]
pub enum SquadError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// The agent teams feature flag is off
    #[error("Agent teams are not enabled (set SQUAD_AGENT_TEAMS=1 or `enabled = true`)")]
    Disabled,

    /// Bad arguments or identifiers supplied by the caller
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Unknown team or member
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
    },

    /// A member with this name is already registered in the team
    #[error("Member '{member}' already exists in team '{team}'")]
    DuplicateMember { team: String, member: String },

    /// A status transition that would move a member or team backwards
    #[error("Illegal lifecycle transition for '{subject}': {from} -> {to}")]
    Lifecycle {
        subject: String,
        from: String,
        to: String,
    },

    /// The executor refused or failed to accept a submission
    #[error("Executor error: {message}")]
    Executor {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        context: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// Storage layout errors (registry or mailbox in an unexpected state)
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl SquadError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "SQUAD_CONFIG",
            Self::Disabled => "SQUAD_DISABLED",
            Self::InvalidInput { .. } => "SQUAD_INVALID_INPUT",
            Self::NotFound { .. } => "SQUAD_NOT_FOUND",
            Self::DuplicateMember { .. } => "SQUAD_DUPLICATE_MEMBER",
            Self::Lifecycle { .. } => "SQUAD_LIFECYCLE",
            Self::Executor { .. } => "SQUAD_EXECUTOR",
            Self::Io { .. } => "SQUAD_IO",
            Self::Json { .. } => "SQUAD_JSON",
            Self::Storage { .. } => "SQUAD_STORAGE",
            Self::Other { .. } => "SQUAD_OTHER",
        }
    }

    /// Optional context about the error
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Executor { context, .. }
            | Self::Io { context, .. }
            | Self::Json { context, .. }
            | Self::Storage { context, .. }
            | Self::Other { context, .. } => context.as_deref(),
            _ => None,
        }
    }

    /// Low-level storage faults may succeed on a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Usage errors are reported immediately and never retried
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::NotFound { .. } | Self::DuplicateMember { .. }
        )
    }
}
