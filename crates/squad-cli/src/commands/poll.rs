//! Poll command implementation

use crate::args::OutputFormat;
use crate::console::{CLIConsole, format};
use crate::exit::ExitClass;
use squad_core::error::SquadResult;
use squad_core::{Snapshot, TeamManager};
use std::time::Duration;

const MEMBER_COLUMNS: [usize; 5] = [20, 20, 18, 10, 9];

pub struct PollArgs {
    pub team: String,
    pub wait: bool,
    pub timeout: Option<u64>,
    pub interval: Option<u64>,
    pub member: Option<String>,
    pub format: OutputFormat,
}

pub async fn poll(
    manager: &TeamManager,
    console: &mut CLIConsole,
    args: PollArgs,
) -> SquadResult<ExitClass> {
    if !args.wait {
        let snapshot = manager.snapshot(&args.team, args.member.as_deref()).await?;
        match args.format {
            OutputFormat::Json => console.print_json(&snapshot)?,
            OutputFormat::Text => print_snapshot(console, &snapshot),
        }
        return Ok(ExitClass::from_snapshot(&snapshot));
    }

    let mut options = manager.wait_options(args.timeout.map(Duration::from_secs));
    if let Some(interval) = args.interval {
        options.interval = Duration::from_millis(interval.max(1));
    }
    if let Some(member) = args.member {
        options = options.for_member(member);
    }

    console.start_progress(&format!("Waiting for team '{}'", args.team));
    let outcome = manager.wait(&args.team, &options).await;
    console.finish_progress();
    let outcome = outcome?;

    match args.format {
        OutputFormat::Json => console.print_json(&serde_json::json!({
            "result": outcome.result,
            "elapsed_ms": outcome.elapsed.as_millis() as u64,
            "completed": outcome.completed(),
            "pending": outcome.pending(),
            "failed": outcome.failed(),
            "snapshot": outcome.snapshot,
        }))?,
        OutputFormat::Text => {
            print_snapshot(console, &outcome.snapshot);
            println!();
            println!(
                "Result: {} after {}",
                outcome.result,
                format::duration(outcome.elapsed)
            );
        }
    }

    let class = ExitClass::from(outcome.result);
    match class {
        ExitClass::Failure => console.error(&format!(
            "Team '{}' failed: {}",
            args.team,
            outcome.failed().join(", ")
        )),
        ExitClass::Timeout => console.warn(&format!(
            "Timed out with {} pending: {}",
            outcome.pending().len(),
            outcome.pending().join(", ")
        )),
        _ => {}
    }
    Ok(class)
}

/// Member table shared by `poll` and `status`
pub(crate) fn print_snapshot(console: &CLIConsole, snapshot: &Snapshot) {
    console.print_table_header(
        &["MEMBER", "ROLE", "STATUS", "OUTCOME", "PROCESSED"],
        &MEMBER_COLUMNS,
    );
    for member in &snapshot.members {
        let status = member.status.to_string();
        let outcome = member.outcome.to_string();
        let processed = member.processed_count.to_string();
        console.print_table_row(
            &[
                member.name.as_str(),
                member.role.as_str(),
                status.as_str(),
                outcome.as_str(),
                processed.as_str(),
            ],
            &MEMBER_COLUMNS,
        );
        if let Some(failure) = &member.failure {
            println!("    {} {}", format::outcome(member.outcome), failure);
        }
    }

    println!();
    println!(
        "{} completed, {} failed, {} pending",
        snapshot.completed().len(),
        snapshot.failed().len(),
        snapshot.pending().len()
    );
}
