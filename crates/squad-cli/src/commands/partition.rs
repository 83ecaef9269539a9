//! Partition command implementation

use super::read_input;
use crate::args::OutputFormat;
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use colored::*;
use squad_core::error::SquadResult;
use squad_core::{PartitionMode, TeamManager, parse_targets};

/// Preview how targets would be split, without touching team storage
pub async fn partition(
    manager: &TeamManager,
    console: &CLIConsole,
    input: &str,
    mode: PartitionMode,
    output: OutputFormat,
) -> SquadResult<ExitClass> {
    let targets = parse_targets(&read_input(input).await?)?;
    let partition = manager.partition(&targets, mode)?;

    if partition.mode != partition.requested {
        console.warn(&format!(
            "No module structure in target ids; partitioned {} instead of {}",
            partition.mode, partition.requested
        ));
    }

    if output == OutputFormat::Json {
        console.print_json(&partition)?;
        return Ok(ExitClass::Success);
    }

    console.print_header(&format!(
        "{} targets, {}",
        partition.target_count(),
        partition.mode
    ));
    for bucket in &partition.buckets {
        println!(
            "{} ({})",
            bucket.key.bold(),
            bucket.targets.len().to_string().cyan()
        );
        for target in &bucket.targets {
            if target.hint.is_empty() {
                println!("  {}", target.id);
            } else {
                println!("  {}  {}", target.id, target.hint.dimmed());
            }
        }
    }

    Ok(ExitClass::Success)
}
