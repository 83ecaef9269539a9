//! Shutdown command implementation

use crate::console::{CLIConsole, format};
use crate::exit::ExitClass;
use squad_core::error::SquadResult;
use squad_core::{ShutdownMode, TeamManager};
use std::time::Duration;

pub struct ShutdownArgs {
    pub team: String,
    pub force: bool,
    pub keep_results: bool,
    pub ack_timeout: Option<u64>,
}

pub async fn shutdown(
    manager: &TeamManager,
    console: &mut CLIConsole,
    args: ShutdownArgs,
) -> SquadResult<ExitClass> {
    let mode = if args.force {
        ShutdownMode::Forced
    } else {
        ShutdownMode::Graceful
    };
    let options = manager
        .shutdown_options(mode, args.ack_timeout.map(Duration::from_secs))
        .keep_results(args.keep_results);

    if mode == ShutdownMode::Graceful {
        console.start_progress(&format!(
            "Waiting up to {} for acknowledgements",
            format::duration(options.ack_timeout)
        ));
    }
    let report = manager.shutdown(&args.team, &options).await;
    console.finish_progress();
    let report = report?;

    if !report.acknowledged.is_empty() {
        console.info(&format!("Acknowledged: {}", report.acknowledged.join(", ")));
    }
    if !report.unresponsive.is_empty() {
        console.warn(&format!(
            "No acknowledgement from: {}",
            report.unresponsive.join(", ")
        ));
    }
    if report.final_report.is_none() {
        console.warn("Final results could not be collected");
    }
    if let Some(path) = &report.archive_path {
        console.success(&format!("Results archived to {}", format::path(path)));
        println!("{}", path.display());
    }
    console.success(&format!("Team '{}' shut down ({})", report.team, report.mode));

    Ok(ExitClass::Success)
}
