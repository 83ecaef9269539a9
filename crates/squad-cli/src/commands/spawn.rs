//! Spawn command implementation

use super::read_input;
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use squad_core::error::SquadResult;
use squad_core::{SpawnRequest, TeamManager, parse_targets};
use std::path::PathBuf;

pub struct SpawnArgs {
    pub team: String,
    pub name: String,
    pub role: String,
    pub instructions: String,
    pub targets: Option<PathBuf>,
    pub references: Vec<PathBuf>,
}

/// Register a member and hand its assignment to the executor
pub async fn spawn(
    manager: &TeamManager,
    console: &CLIConsole,
    args: SpawnArgs,
) -> SquadResult<ExitClass> {
    let targets = match &args.targets {
        Some(path) => parse_targets(&read_input(&path.to_string_lossy()).await?)?,
        None => Vec::new(),
    };
    console.info(&format!(
        "Spawning '{}' in team '{}' with {} targets via {} executor",
        args.name,
        args.team,
        targets.len(),
        manager.executor_name()
    ));

    let request = SpawnRequest::new(args.name, args.role)
        .with_instructions(args.instructions)
        .with_targets(targets)
        .with_reference_paths(args.references);
    let member = manager.spawn(&args.team, request).await?;

    console.success(&format!(
        "Spawned {} ({}, {} targets)",
        member.agent_id,
        member.role,
        member.targets.len()
    ));
    if let Some(submission) = &member.submission {
        console.info(&format!("Submission: {}", submission));
    }
    println!("{}", member.agent_id);

    Ok(ExitClass::Success)
}
