//! Configuration model

use super::logging_config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    /// Feature flag: when false every team operation fails fast
    pub enabled: bool,
    /// Root directory holding one sub-directory per team
    pub teams_dir: PathBuf,
    /// Where final-result snapshots are written when results are kept
    pub archive_dir: PathBuf,
    /// Interval between mailbox re-reads while waiting
    pub poll_interval_ms: u64,
    /// Default bound for `wait`
    pub default_wait_timeout_secs: u64,
    /// Bound for the graceful shutdown acknowledgement exchange
    pub shutdown_ack_timeout_secs: u64,
    /// External executor settings
    pub executor: ExecutorConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for SquadConfig {
    fn default() -> Self {
        let base = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".squad");
        Self {
            enabled: false,
            teams_dir: base.join("teams"),
            archive_dir: base.join("archive"),
            poll_interval_ms: 500,
            default_wait_timeout_secs: 300,
            shutdown_ack_timeout_secs: 30,
            executor: ExecutorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SquadConfig {
    /// Configuration rooted at `root`, with the feature enabled. Used by tests and
    /// embedders that manage their own storage location.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            enabled: true,
            teams_dir: root.join("teams"),
            archive_dir: root.join("archive"),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn default_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.default_wait_timeout_secs)
    }

    pub fn shutdown_ack_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_ack_timeout_secs)
    }
}

/// How teammates are launched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Command run once per spawned teammate (through `shell`)
    pub command: Option<String>,
    /// Shell used to run `command`
    pub shell: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: None,
            shell: "sh".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SquadConfig::default();
        assert!(!config.enabled);
        assert!(config.teams_dir.ends_with(".squad/teams"));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.shutdown_ack_timeout(), Duration::from_secs(30));
        assert_eq!(config.executor.shell, "sh");
    }

    #[test]
    fn test_rooted_at_enables_feature() {
        let config = SquadConfig::rooted_at("/tmp/squad-test");
        assert!(config.enabled);
        assert_eq!(config.teams_dir, PathBuf::from("/tmp/squad-test/teams"));
        assert_eq!(config.archive_dir, PathBuf::from("/tmp/squad-test/archive"));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = SquadConfig {
            poll_interval_ms: 0,
            ..SquadConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
