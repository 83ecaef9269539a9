//! Squad Core Library
//!
//! File-backed coordination of a team of autonomous workers: a lead partitions work,
//! spawns one teammate per bucket, waits for their mailboxes to report completion,
//! merges the results and tears the team down.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod executor;
pub mod layout;
pub mod mailbox;
pub mod partition;
pub mod poller;
pub mod shutdown;
pub mod spawner;
pub mod team;
pub mod teammate;

// Re-export commonly used types
pub use aggregator::{AggregateReport, Aggregator, Artifact, MemberResult};
pub use config::{SquadConfig, load_config};
pub use error::{SquadError, SquadResult};
pub use executor::{
    Assignment, DetachedExecutor, Executor, InProcessExecutor, ProcessExecutor, Submission,
    TaskHandle, TaskOutcome,
};
pub use layout::StorageLayout;
pub use mailbox::{CompletionPayload, FailurePayload, MailboxStore, Message, MessageKind};
pub use partition::{Partition, PartitionMode, Target, parse_targets};
pub use poller::{MemberOutcome, Poller, Snapshot, WaitOptions, WaitOutcome, WaitResult};
pub use shutdown::{ShutdownCoordinator, ShutdownMode, ShutdownOptions, ShutdownReport};
pub use spawner::{MemberHandle, SpawnRequest, Spawner};
pub use team::{MemberStatus, TeamConfig, TeamManager, TeamMember, TeamStatus};
pub use teammate::Teammate;
