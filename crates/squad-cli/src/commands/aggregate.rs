//! Aggregate command implementation

use crate::args::OutputFormat;
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use squad_core::TeamManager;
use squad_core::error::SquadResult;

pub async fn aggregate(
    manager: &TeamManager,
    console: &CLIConsole,
    team: &str,
    output: OutputFormat,
) -> SquadResult<ExitClass> {
    let report = manager.aggregate(team).await?;

    match output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print!("{}", report.render_text()),
    }
    if report.pending > 0 {
        console.warn(&format!(
            "{} member(s) have not reported yet; the report is partial",
            report.pending
        ));
    }

    Ok(ExitClass::from_report(&report))
}
