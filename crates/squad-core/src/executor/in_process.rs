//! Executor running teammates as tokio tasks inside the lead process

use super::{Assignment, Executor, Submission, TaskHandle, TaskOutcome};
use crate::error::SquadResult;
use crate::mailbox::FailurePayload;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type TaskFn =
    Arc<dyn Fn(Assignment, CancellationToken) -> BoxFuture<'static, TaskOutcome> + Send + Sync>;

/// Handle on a spawned tokio task
pub struct JoinTaskHandle {
    id: String,
    cancel: CancellationToken,
    join: JoinHandle<TaskOutcome>,
}

impl JoinTaskHandle {
    pub fn new(id: impl Into<String>, cancel: CancellationToken, join: JoinHandle<TaskOutcome>) -> Self {
        Self {
            id: id.into(),
            cancel,
            join,
        }
    }
}

#[async_trait]
impl TaskHandle for JoinTaskHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn result(self: Box<Self>) -> TaskOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(FailurePayload::new("Task was aborted")),
            Err(e) => Err(FailurePayload::new(format!("Task panicked: {}", e))),
        }
    }
}

/// Runs each assignment through a caller-supplied async function.
///
/// The function receives a cancellation token; the task is also dropped when the token
/// fires, so functions that never check it are still stopped at their next await point.
#[derive(Clone)]
pub struct InProcessExecutor {
    task: TaskFn,
}

impl InProcessExecutor {
    pub fn new<F, Fut>(task: F) -> Self
    where
        F: Fn(Assignment, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        Self {
            task: Arc::new(
                move |assignment: Assignment, cancel: CancellationToken| -> BoxFuture<'static, TaskOutcome> {
                    Box::pin(task(assignment, cancel))
                },
            ),
        }
    }
}

#[async_trait]
impl Executor for InProcessExecutor {
    fn name(&self) -> &str {
        "in-process"
    }

    async fn submit(&self, assignment: Assignment) -> SquadResult<Submission> {
        let cancel = CancellationToken::new();
        let id = format!("task:{}", uuid::Uuid::new_v4().simple());
        debug!(agent = %assignment.agent_id, task = %id, "Starting in-process teammate");

        let work = (self.task)(assignment, cancel.clone());
        let stop = cancel.clone();
        let join = tokio::spawn(async move {
            tokio::select! {
                outcome = work => outcome,
                _ = stop.cancelled() => Err(FailurePayload::new("Cancelled before completion")),
            }
        });

        Ok(Submission::Attached(Box::new(JoinTaskHandle::new(id, cancel, join))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support;
    use crate::layout::StorageLayout;
    use crate::mailbox::CompletionPayload;
    use std::time::Duration;

    fn layout() -> StorageLayout {
        StorageLayout::new("/tmp/squad-teams", "/tmp/squad-archive")
    }

    #[tokio::test]
    async fn test_attached_result() {
        let executor = InProcessExecutor::new(|assignment: Assignment, _cancel| async move {
            Ok(CompletionPayload::new(assignment.targets.len() as u64))
        });

        let submission = executor
            .submit(test_support::assignment(&layout(), "alpha", "unit-1"))
            .await
            .unwrap();
        let Submission::Attached(handle) = submission else {
            panic!("expected an attached submission");
        };
        assert!(handle.id().starts_with("task:"));
        assert_eq!(handle.result().await.unwrap().processed_count, 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_task() {
        let executor = InProcessExecutor::new(|_assignment: Assignment, _cancel| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CompletionPayload::new(1))
        });

        let Submission::Attached(handle) = executor
            .submit(test_support::assignment(&layout(), "alpha", "slow"))
            .await
            .unwrap()
        else {
            panic!("expected an attached submission");
        };
        handle.cancel();

        let failure = tokio::time::timeout(Duration::from_secs(5), handle.result())
            .await
            .unwrap()
            .unwrap_err();
        assert!(failure.message.contains("Cancelled"));
    }
}
