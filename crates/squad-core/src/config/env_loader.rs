//! Environment variable-based configuration overrides

use super::model::SquadConfig;
use crate::error::{SquadError, SquadResult};
use std::path::PathBuf;

/// Apply `SQUAD_*` overrides from the process environment
pub fn apply_env_overrides(config: &mut SquadConfig) -> SquadResult<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using an arbitrary variable lookup
///
/// Recognized variables:
/// - `SQUAD_AGENT_TEAMS` (feature flag: 1/true/yes/on)
/// - `SQUAD_TEAMS_DIR`, `SQUAD_ARCHIVE_DIR`
/// - `SQUAD_POLL_INTERVAL_MS`, `SQUAD_WAIT_TIMEOUT_SECS`, `SQUAD_ACK_TIMEOUT_SECS`
/// - `SQUAD_EXECUTOR_COMMAND`, `SQUAD_LOG_LEVEL`
pub fn apply_overrides_from<F>(config: &mut SquadConfig, lookup: F) -> SquadResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(flag) = lookup("SQUAD_AGENT_TEAMS") {
        config.enabled = parse_flag(&flag);
    }

    if let Some(dir) = lookup("SQUAD_TEAMS_DIR") {
        config.teams_dir = PathBuf::from(dir);
    }

    if let Some(dir) = lookup("SQUAD_ARCHIVE_DIR") {
        config.archive_dir = PathBuf::from(dir);
    }

    if let Some(value) = lookup("SQUAD_POLL_INTERVAL_MS") {
        config.poll_interval_ms = parse_number("SQUAD_POLL_INTERVAL_MS", &value)?;
    }

    if let Some(value) = lookup("SQUAD_WAIT_TIMEOUT_SECS") {
        config.default_wait_timeout_secs = parse_number("SQUAD_WAIT_TIMEOUT_SECS", &value)?;
    }

    if let Some(value) = lookup("SQUAD_ACK_TIMEOUT_SECS") {
        config.shutdown_ack_timeout_secs = parse_number("SQUAD_ACK_TIMEOUT_SECS", &value)?;
    }

    if let Some(command) = lookup("SQUAD_EXECUTOR_COMMAND") {
        config.executor.command = Some(command).filter(|c| !c.trim().is_empty());
    }

    if let Some(level) = lookup("SQUAD_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number(name: &str, value: &str) -> SquadResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| SquadError::config(format!("Invalid {} value: '{}'", name, value)))
}
