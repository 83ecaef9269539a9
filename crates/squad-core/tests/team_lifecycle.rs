//! End-to-end team lifecycle tests
//!
//! Partition, spawn, wait, aggregate and shut down a team against real storage in a
//! temporary directory, with teammates running in-process.

use squad_core::executor::{Assignment, InProcessExecutor};
use squad_core::partition::{INTEGRATION_ROLE, PROPERTY_ROLE, UNIT_ROLE};
use squad_core::shutdown::ArchiveRecord;
use squad_core::{
    CompletionPayload, FailurePayload, MemberOutcome, MemberStatus, PartitionMode, ShutdownMode, SpawnRequest,
    SquadConfig, Target, TeamManager, TeamStatus, Teammate, WaitResult,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(tmp: &TempDir) -> SquadConfig {
    let mut config = SquadConfig::rooted_at(tmp.path());
    config.poll_interval_ms = 10;
    config
}

fn ten_targets() -> Vec<Target> {
    vec![
        Target::new("parse_header", "isolated unit with mocks"),
        Target::new("parse_body", "stub the reader"),
        Target::new("format_date", "pure function"),
        Target::new("slugify", "unit"),
        Target::new("retry_policy", "fake clock"),
        Target::new("user_repo", "database queries"),
        Target::new("order_api", "http endpoint"),
        Target::new("cache_store", "docker container"),
        Target::new("codec", "proptest encode/decode"),
        Target::new("ledger", "balance invariant"),
    ]
}

/// Unit testers finish after 400ms, integration testers fail after 80ms, property
/// testers run until cancelled.
fn scripted_manager(tmp: &TempDir) -> TeamManager {
    let executor = InProcessExecutor::new(|assignment: Assignment, cancel| async move {
        let processed = assignment.targets.len() as u64;
        match assignment.role.as_str() {
            UNIT_ROLE => {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Ok(CompletionPayload::new(processed).with_artifacts(["tests/unit.rs"]))
            }
            INTEGRATION_ROLE => {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Err(FailurePayload::new("database unreachable")
                    .with_partial_artifacts(["tests/db.rs"]))
            }
            _ => {
                cancel.cancelled().await;
                Err(FailurePayload::new("cancelled"))
            }
        }
    });
    TeamManager::new(config(tmp), Arc::new(executor))
}

fn completing_manager(tmp: &TempDir) -> TeamManager {
    let executor = InProcessExecutor::new(|assignment: Assignment, _cancel| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(CompletionPayload::new(assignment.targets.len() as u64)
            .with_artifacts([format!("tests/{}.rs", assignment.member)])
            .with_metric("role", assignment.role.clone()))
    });
    TeamManager::new(config(tmp), Arc::new(executor))
}

#[tokio::test]
async fn test_fail_fast_scenario_then_forced_archive() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = scripted_manager(&tmp);

    let partition = manager.partition(&ten_targets(), PartitionMode::ByRole).unwrap();
    assert_eq!(partition.bucket(UNIT_ROLE).unwrap().targets.len(), 5);
    assert_eq!(partition.bucket(INTEGRATION_ROLE).unwrap().targets.len(), 3);
    assert_eq!(partition.bucket(PROPERTY_ROLE).unwrap().targets.len(), 2);

    for (name, role) in [("a", UNIT_ROLE), ("b", INTEGRATION_ROLE), ("c", PROPERTY_ROLE)] {
        let targets = partition.bucket(role).unwrap().targets.clone();
        manager
            .spawn("alpha", SpawnRequest::new(name, role).with_targets(targets))
            .await
            .unwrap();
    }

    let outcome = manager
        .wait("alpha", &manager.wait_options(Some(Duration::from_secs(3))))
        .await
        .unwrap();
    assert_eq!(outcome.result, WaitResult::Failure);
    assert_eq!(outcome.failed(), vec!["b"]);
    // b fails at 80ms while a is still working until 400ms
    assert!(outcome.pending().contains(&"a".to_string()));
    assert!(outcome.pending().contains(&"c".to_string()));
    assert!(outcome.completed().is_empty());
    assert!(outcome.elapsed < Duration::from_secs(1));

    let options = manager
        .shutdown_options(ShutdownMode::Forced, None)
        .keep_results(true);
    let report = manager.shutdown("alpha", &options).await.unwrap();

    let archive = report.archive_path.expect("archive written");
    let record: ArchiveRecord =
        serde_json::from_str(&std::fs::read_to_string(&archive).unwrap()).unwrap();
    assert_eq!(record.team.status, TeamStatus::Archived);
    let final_report = record.report.unwrap();
    // a may or may not have finished before the forced stop; c never does
    assert_eq!(final_report.failed, 1);
    assert_eq!(final_report.completed + final_report.pending, 2);
    assert_eq!(final_report.members[2].outcome, MemberOutcome::Pending);
    assert!(final_report.errors.contains(&"b: database unreachable".to_string()));
    assert!(!manager.registry().exists("alpha"));
}

#[tokio::test]
async fn test_forced_shutdown_with_pending_members_removes_storage() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = TeamManager::detached(config(&tmp));

    for name in ["a", "b", "c"] {
        manager
            .spawn("alpha", SpawnRequest::new(name, UNIT_ROLE))
            .await
            .unwrap();
    }
    let mut teammate = Teammate::open(manager.store(), "alpha", "a").await.unwrap();
    teammate.complete(CompletionPayload::new(2)).await.unwrap();

    let report = manager
        .shutdown("alpha", &manager.shutdown_options(ShutdownMode::Forced, None))
        .await
        .unwrap();

    let final_report = report.final_report.unwrap();
    assert_eq!(final_report.completed, 1);
    assert_eq!(final_report.pending, 2);
    assert_eq!(final_report.total_processed, 2);
    assert!(report.archive_path.is_none());
    assert!(!tmp.path().join("teams").join("alpha").exists());
    assert!(manager.list_teams().await.unwrap().is_empty());
    assert!(
        std::fs::read_dir(tmp.path().join("archive"))
            .map(|entries| entries.count() == 0)
            .unwrap_or(true)
    );
}

#[tokio::test]
async fn test_successful_run_aggregates_every_member() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = completing_manager(&tmp);

    let partition = manager.partition(&ten_targets(), PartitionMode::ByRole).unwrap();
    let members = manager
        .spawn_partition("alpha", &partition, "write tests")
        .await
        .unwrap();
    assert_eq!(members.len(), 3);

    let outcome = manager
        .wait("alpha", &manager.wait_options(Some(Duration::from_secs(5))))
        .await
        .unwrap();
    assert_eq!(outcome.result, WaitResult::Success);
    assert_eq!(outcome.completed().len(), 3);

    let report = manager.aggregate("alpha").await.unwrap();
    assert_eq!(report.total_processed, 10);
    assert_eq!(
        report.total_processed,
        report.members.iter().map(|m| m.processed_count).sum::<u64>()
    );
    assert_eq!(report.artifacts.len(), 3);
    assert!(report.is_complete());

    let status = manager.status("alpha").await.unwrap();
    assert!(
        status
            .team
            .members
            .iter()
            .all(|m| m.status == MemberStatus::Completed)
    );

    // every member already posted a terminal message, which counts as the ack
    let options = manager.shutdown_options(ShutdownMode::Graceful, Some(Duration::from_secs(5)));
    let started = std::time::Instant::now();
    let shutdown = manager.shutdown("alpha", &options).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(shutdown.acknowledged.len(), 3);
    assert!(shutdown.unresponsive.is_empty());
}

#[tokio::test]
async fn test_graceful_shutdown_cancels_running_relay() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = scripted_manager(&tmp);

    manager
        .spawn("alpha", SpawnRequest::new("c", PROPERTY_ROLE))
        .await
        .unwrap();

    let options = manager.shutdown_options(ShutdownMode::Graceful, Some(Duration::from_secs(5)));
    let report = manager.shutdown("alpha", &options).await.unwrap();
    assert_eq!(report.acknowledged, vec!["c"]);
    assert_eq!(report.final_report.unwrap().pending, 1);
}

#[tokio::test]
async fn test_graceful_shutdown_with_unresponsive_member_is_bounded() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = TeamManager::detached(config(&tmp));

    manager
        .spawn("alpha", SpawnRequest::new("quiet", UNIT_ROLE))
        .await
        .unwrap();

    let options = manager.shutdown_options(ShutdownMode::Graceful, Some(Duration::from_millis(200)));
    let started = std::time::Instant::now();
    let report = manager.shutdown("alpha", &options).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.unresponsive, vec!["quiet"]);
    assert!(!manager.registry().exists("alpha"));
}

#[tokio::test]
async fn test_wait_times_out_without_cancelling() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = TeamManager::detached(config(&tmp));
    manager
        .spawn("alpha", SpawnRequest::new("slow", UNIT_ROLE))
        .await
        .unwrap();

    let outcome = manager
        .wait("alpha", &manager.wait_options(Some(Duration::from_millis(150))))
        .await
        .unwrap();
    assert_eq!(outcome.result, WaitResult::Timeout);
    assert_eq!(outcome.pending(), vec!["slow"]);

    // a late result is still picked up
    let mut teammate = Teammate::open(manager.store(), "alpha", "slow").await.unwrap();
    teammate.complete(CompletionPayload::new(1)).await.unwrap();
    let outcome = manager
        .wait("alpha", &manager.wait_options(Some(Duration::from_secs(1))))
        .await
        .unwrap();
    assert_eq!(outcome.result, WaitResult::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spawns_lose_no_members() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = Arc::new(completing_manager(&tmp));

    let mut handles = Vec::new();
    for i in 0..12 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .spawn("alpha", SpawnRequest::new(format!("worker-{}", i), UNIT_ROLE))
                .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let config = manager.registry().load("alpha").await.unwrap();
    assert_eq!(config.members.len(), 12);
    assert_eq!(config.status, TeamStatus::Active);

    let outcome = manager
        .wait("alpha", &manager.wait_options(Some(Duration::from_secs(5))))
        .await
        .unwrap();
    assert_eq!(outcome.result, WaitResult::Success);
}

#[tokio::test]
async fn test_spawn_after_shutdown_started_is_rejected() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let manager = TeamManager::detached(config(&tmp));
    manager
        .spawn("alpha", SpawnRequest::new("a", UNIT_ROLE))
        .await
        .unwrap();
    manager
        .registry()
        .update("alpha", |config| {
            config.advance(TeamStatus::ShuttingDown)?;
            Ok(())
        })
        .await
        .unwrap();

    let err = assert_err!(
        manager
            .spawn("alpha", SpawnRequest::new("b", UNIT_ROLE))
            .await
    );
    assert_eq!(err.error_code(), "SQUAD_LIFECYCLE");
}

#[tokio::test]
async fn test_disabled_manager_touches_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut config = config(&tmp);
    config.enabled = false;
    let manager = TeamManager::detached(config);

    let err = manager
        .spawn("alpha", SpawnRequest::new("a", UNIT_ROLE))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "SQUAD_DISABLED");
    assert!(
        manager
            .shutdown("alpha", &manager.shutdown_options(ShutdownMode::Forced, None))
            .await
            .is_err()
    );
    assert!(!tmp.path().join("teams").exists());
}
