//! Teams command implementation

use crate::args::OutputFormat;
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use squad_core::TeamManager;
use squad_core::error::SquadResult;

const TEAM_COLUMNS: [usize; 4] = [24, 14, 8, 25];

pub async fn teams(
    manager: &TeamManager,
    console: &CLIConsole,
    output: OutputFormat,
) -> SquadResult<ExitClass> {
    let teams = manager.list_teams().await?;

    if output == OutputFormat::Json {
        console.print_json(&teams)?;
        return Ok(ExitClass::Success);
    }

    if teams.is_empty() {
        console.info(&format!(
            "No teams under {}",
            manager.config().teams_dir.display()
        ));
        return Ok(ExitClass::Success);
    }

    console.print_table_header(&["TEAM", "STATUS", "MEMBERS", "UPDATED"], &TEAM_COLUMNS);
    for team in &teams {
        let status = team.status.to_string();
        let members = team.members.len().to_string();
        let updated = team.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();
        console.print_table_row(
            &[team.name.as_str(), status.as_str(), members.as_str(), updated.as_str()],
            &TEAM_COLUMNS,
        );
    }

    Ok(ExitClass::Success)
}
