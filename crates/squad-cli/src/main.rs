//! Squad CLI application
//!
//! Command-line front end for a team lead coordinating file-backed teammates.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/squad-cli
//! ```
//!
//! # Exit codes
//!
//! - `0` success
//! - `1` a teammate reported failure
//! - `2` the wait timed out
//! - `3` usage, configuration or storage error (including agent teams being disabled)

mod args;
mod commands;
mod console;
mod exit;
mod logging;
mod router;

use clap::Parser;
use std::process::ExitCode;

pub use args::{Cli, Commands, PostMessage};

use crate::console::CLIConsole;
use crate::exit::ExitClass;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let console = CLIConsole::new(cli.verbose);

    let class = match router::route(cli).await {
        Ok(class) => class,
        Err(error) => {
            console.error(&error.to_string());
            if let Some(context) = error.context() {
                console.info(context);
            }
            tracing::debug!(code = error.error_code(), "Command failed");
            ExitClass::Error
        }
    };
    class.into()
}
