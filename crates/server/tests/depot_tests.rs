//! End-to-end tests for the depot process.

mod common;

use common::TestDepot;
use depot_core::config::AppConfig;
use depot_core::{MetadataEventStatus, MetadataNotification, StoreProjectData};
use depot_notifications::NotificationFilter;
use depot_server::scheduler::{self, RunOutcome};
use depot_store::repos::{ProjectVersionsRepo, ProjectsRepo};

#[tokio::test]
async fn test_queue_observer_registers_versions() {
    let depot = TestDepot::new().await;
    let state = &depot.state;
    ProjectsRepo::new(state.substrate.clone())
        .create_or_update(&StoreProjectData::new("PROD-1", "org.finos", "sample"))
        .await
        .unwrap();

    let known = state
        .notifications
        .notify(&MetadataNotification::new("org.finos", "sample", "1.2.0"))
        .await
        .unwrap();
    let unknown = state
        .notifications
        .notify(&MetadataNotification::new("org.finos", "missing", "1.0.0"))
        .await
        .unwrap();
    assert_eq!(state.notifications.queue_size().await.unwrap(), 2);

    let observer = scheduler::configured_jobs(state).remove(0);
    assert_eq!(observer.name, "queue-observer_1");
    let outcome = scheduler::run_once(state, &observer).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { processed: 2 });
    assert_eq!(state.notifications.queue_size().await.unwrap(), 0);

    let version = ProjectVersionsRepo::new(state.substrate.clone())
        .find_version("org.finos", "sample", "1.2.0")
        .await
        .unwrap();
    assert!(version.is_some());

    let history = state.notifications.history();
    let succeeded = history.get(&known).await.unwrap().unwrap();
    assert_eq!(succeeded.status, Some(MetadataEventStatus::Success));
    let failed = history.get(&unknown).await.unwrap().unwrap();
    assert_eq!(failed.status, Some(MetadataEventStatus::Failed));

    let failures = history
        .find(&NotificationFilter {
            success: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);

    let runs = state.schedule_instances.find("queue-observer_1").await.unwrap();
    assert_eq!(runs.len(), 1);
}

#[tokio::test]
async fn test_housekeeping_job_runs() {
    let mut config = AppConfig::for_testing();
    config.housekeeping.retention_days = 1;
    let depot = TestDepot::with_config(config).await;
    let state = &depot.state;

    let housekeeping = scheduler::configured_jobs(state).pop().unwrap();
    assert_eq!(housekeeping.name, "clean-notifications-schedule");
    assert_eq!(
        scheduler::run_once(state, &housekeeping).await.unwrap(),
        RunOutcome::Completed { processed: 0 }
    );

    let info = state
        .schedules
        .get("clean-notifications-schedule")
        .await
        .unwrap()
        .unwrap();
    assert!(info.last_executed.is_some());
}

#[tokio::test]
async fn test_admin_commands() {
    let depot = TestDepot::new().await;
    let admin = &depot.state.admin;

    let collections = admin.get_all_collections();
    assert_eq!(collections.len(), 11);
    assert!(collections.contains(&"notifications_queue".to_string()));

    assert_eq!(admin.get_all_indexes().await.unwrap().len(), 11);
    assert_eq!(admin.delete_index("query-metrics").await.unwrap(), "query-metrics:index");
    assert_eq!(admin.get_all_indexes().await.unwrap().len(), 10);
    assert_eq!(depot.state.bootstrap().await.unwrap().len(), 11);
    assert_eq!(admin.get_all_indexes().await.unwrap().len(), 11);
}
