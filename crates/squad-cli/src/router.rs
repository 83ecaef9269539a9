//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands::{self, poll::PollArgs, shutdown::ShutdownArgs, spawn::SpawnArgs};
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use crate::logging;
use squad_core::error::SquadResult;
use squad_core::{PartitionMode, SquadConfig, TeamManager, load_config};
use std::path::Path;
use tracing::debug;

/// Load configuration, install logging and route the command to its handler
pub async fn route(cli: Cli) -> SquadResult<ExitClass> {
    let config = resolve_config(&cli)?;
    logging::init(&config.logging, cli.verbose);
    debug!(
        teams_dir = %config.teams_dir.display(),
        enabled = config.enabled,
        "Configuration loaded"
    );

    let manager = TeamManager::detached(config);
    let mut console = CLIConsole::new(cli.verbose);

    match cli.command {
        Commands::Spawn {
            team,
            name,
            role,
            instructions,
            targets,
            references,
            command: _,
        } => {
            let args = SpawnArgs {
                team,
                name,
                role,
                instructions,
                targets,
                references,
            };
            commands::spawn::spawn(&manager, &console, args).await
        }
        Commands::Poll {
            team,
            wait,
            timeout,
            interval,
            member,
            format,
        } => {
            let args = PollArgs {
                team,
                wait,
                timeout,
                interval,
                member,
                format,
            };
            commands::poll::poll(&manager, &mut console, args).await
        }
        Commands::Status { team, format } => {
            commands::status::status(&manager, &console, &team, format).await
        }
        Commands::Aggregate { team, format } => {
            commands::aggregate::aggregate(&manager, &console, &team, format).await
        }
        Commands::Shutdown {
            team,
            force,
            keep_results,
            ack_timeout,
        } => {
            let args = ShutdownArgs {
                team,
                force,
                keep_results,
                ack_timeout,
            };
            commands::shutdown::shutdown(&manager, &mut console, args).await
        }
        Commands::Partition {
            input,
            by_module,
            format,
            ..
        } => {
            let mode = if by_module {
                PartitionMode::ByModule
            } else {
                PartitionMode::ByRole
            };
            commands::partition::partition(&manager, &console, &input, mode, format).await
        }
        Commands::Post {
            team,
            member,
            message,
        } => commands::post::post(&manager, &console, &team, &member, message).await,
        Commands::Teams { format } => commands::teams::teams(&manager, &console, format).await,
    }
}

/// Defaults, then the config file, then `SQUAD_*` variables, then flags
fn resolve_config(cli: &Cli) -> SquadResult<SquadConfig> {
    let mut config = load_config(Some(Path::new(&cli.config_file)))?;
    if let Some(teams_dir) = &cli.teams_dir {
        config.teams_dir = teams_dir.clone();
    }
    if let Commands::Spawn {
        command: Some(command),
        ..
    } = &cli.command
    {
        config.executor.command = Some(command.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("squad").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("squad.json");
        std::fs::write(
            &config_path,
            r#"{"enabled": true, "teams_dir": "/from/file", "executor": {"command": "worker"}}"#,
        )
        .unwrap();

        let config = resolve_config(&cli(&[
            "--config-file",
            config_path.to_str().unwrap(),
            "--teams-dir",
            "/from/flag",
            "spawn",
            "alpha",
            "unit-1",
            "--role",
            "unit-tester",
            "--command",
            "other-worker",
        ]))
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.teams_dir, Path::new("/from/flag"));
        assert_eq!(config.executor.command.as_deref(), Some("other-worker"));
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.json");
        let config = resolve_config(&cli(&[
            "--config-file",
            missing.to_str().unwrap(),
            "teams",
        ]))
        .unwrap();
        assert_eq!(config.poll_interval_ms, 500);
    }
}
