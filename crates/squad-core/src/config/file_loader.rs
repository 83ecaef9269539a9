//! File-based configuration loading

use super::model::SquadConfig;
use crate::error::{SquadError, SquadResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> SquadResult<SquadConfig> {
    if !path.exists() {
        return Ok(SquadConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        SquadError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config: SquadConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            SquadError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            SquadError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            SquadError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(&temp_dir.path().join("absent.json")).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("squad.json");
        fs::write(
            &config_path,
            r#"{ "enabled": true, "poll_interval_ms": 50, "logging": { "format": "json" } }"#,
        )
        .unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.shutdown_ack_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("squad.toml");
        fs::write(
            &config_path,
            "enabled = true\nteams_dir = \"/srv/teams\"\n\n[executor]\ncommand = \"run-worker\"\n",
        )
        .unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.teams_dir, std::path::PathBuf::from("/srv/teams"));
        assert_eq!(config.executor.command.as_deref(), Some("run-worker"));
        assert_eq!(config.executor.shell, "sh");
    }

    #[test]
    fn test_load_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("squad.yaml");
        fs::write(&config_path, "shutdown_ack_timeout_secs: 5\n").unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert_eq!(config.shutdown_ack_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("squad.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = load_from_file(&config_path).unwrap_err();
        assert_eq!(err.error_code(), "SQUAD_CONFIG");
        assert!(err.context().unwrap().contains("squad.json"));
    }
}
