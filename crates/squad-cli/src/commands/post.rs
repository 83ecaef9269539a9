//! Post command implementation
//!
//! The teammate side of the protocol for workers running outside the lead's process.

use crate::args::PostMessage;
use crate::console::CLIConsole;
use crate::exit::ExitClass;
use squad_core::error::SquadResult;
use squad_core::mailbox::AppendOutcome;
use squad_core::{CompletionPayload, FailurePayload, TeamManager};

pub async fn post(
    manager: &TeamManager,
    console: &CLIConsole,
    team: &str,
    member: &str,
    message: PostMessage,
) -> SquadResult<ExitClass> {
    let mut teammate = manager.teammate(team, member).await?;

    let (kind, outcome) = match message {
        PostMessage::Completed {
            processed,
            artifacts,
            metrics,
            errors,
        } => {
            let mut payload = CompletionPayload::new(processed).with_artifacts(artifacts);
            for (key, value) in metrics {
                payload = payload.with_metric(key, value);
            }
            for error in errors {
                payload = payload.with_error(error);
            }
            ("task_completed", teammate.complete(payload).await?)
        }
        PostMessage::Failed {
            message,
            partial_artifacts,
        } => {
            let payload = FailurePayload::new(message).with_partial_artifacts(partial_artifacts);
            ("task_failed", teammate.fail(payload).await?)
        }
        PostMessage::Ack { note } => ("shutdown_ack", teammate.acknowledge_shutdown(note).await?),
        PostMessage::Progress { count, note } => ("progress", teammate.progress(count, note).await?),
    };

    match outcome {
        AppendOutcome::Appended => {
            console.success(&format!("Posted {} for {}", kind, teammate.agent_id()));
        }
        AppendOutcome::Ignored => console.warn(&format!(
            "{} already reported a result; {} ignored",
            teammate.agent_id(),
            kind
        )),
    }

    Ok(ExitClass::Success)
}
