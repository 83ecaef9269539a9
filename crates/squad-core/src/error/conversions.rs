//! From trait implementations for SquadError conversions

use super::types::SquadError;

impl From<anyhow::Error> for SquadError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(error.to_string())
    }
}

impl From<std::io::Error> for SquadError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for SquadError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_retryable() {
        let err: SquadError = std::io::Error::other("disk hiccup").into();
        assert_eq!(err.error_code(), "SQUAD_IO");
        assert!(err.is_retryable());
        assert!(!err.is_usage());
    }

    #[test]
    fn test_usage_errors() {
        assert!(SquadError::duplicate_member("t", "m").is_usage());
        assert!(SquadError::team_not_found("t").is_usage());
        assert!(SquadError::invalid_field("role", "bad").is_usage());
        assert!(!SquadError::Disabled.is_usage());
    }

    #[test]
    fn test_display_messages() {
        let err = SquadError::duplicate_member("alpha", "unit-1");
        assert_eq!(
            err.to_string(),
            "Member 'unit-1' already exists in team 'alpha'"
        );

        let err = SquadError::lifecycle("unit-1@alpha", "completed", "active");
        assert!(err.to_string().contains("completed -> active"));
    }
}
