//! Status command implementation

use super::poll::print_snapshot;
use crate::args::OutputFormat;
use crate::console::{CLIConsole, format};
use crate::exit::ExitClass;
use colored::*;
use squad_core::TeamManager;
use squad_core::error::SquadResult;

/// Show the registry record next to what the mailboxes currently report
pub async fn status(
    manager: &TeamManager,
    console: &CLIConsole,
    team: &str,
    output: OutputFormat,
) -> SquadResult<ExitClass> {
    let report = manager.status(team).await?;
    let class = ExitClass::from_snapshot(&report.snapshot);

    if output == OutputFormat::Json {
        console.print_json(&report)?;
        return Ok(class);
    }

    console.print_header(&format!("Team {}", report.team.name));
    println!("  Status: {}", report.team.status.to_string().cyan());
    if let Some(description) = &report.team.description {
        println!("  Description: {}", description);
    }
    println!("  Created: {}", report.team.created_at.to_rfc3339());
    println!("  Updated: {}", report.team.updated_at.to_rfc3339());
    println!(
        "  Storage: {}",
        format::path(&manager.registry().layout().team_dir(team))
    );
    println!();

    print_snapshot(console, &report.snapshot);
    for member in &report.team.members {
        if let Some(submission) = &member.submission {
            console.info(&format!(
                "{} [{}] submitted as {}",
                member.agent_id,
                format::status(member.status),
                submission
            ));
        }
    }

    Ok(class)
}
