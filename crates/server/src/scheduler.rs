//! Background jobs: queue observers and notification housekeeping.
//!
//! Each job runs on its own fixed delay and interval. Every run is recorded
//! as a schedule instance and refreshes the job's schedule info. A job whose
//! schedule info is marked disabled is skipped until re-enabled.

use crate::state::DepotState;
use anyhow::{Context, Result};
use depot_core::{ScheduleInfo, ScheduleInstance};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Name prefix of the queue observers. Observer `n` is `queue-observer_<n>`.
pub const QUEUE_OBSERVER: &str = "queue-observer";

/// Name of the history purge job.
pub const CLEAN_NOTIFICATIONS: &str = "clean-notifications-schedule";

/// What a scheduled job does on each run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// Claim and process pending notifications.
    QueueObserver,
    /// Purge notification history older than the retention window.
    CleanNotifications { retention_days: u32 },
}

/// A named job with its timing.
#[derive(Clone, Debug)]
pub struct Job {
    pub name: String,
    pub kind: JobKind,
    pub delay: Duration,
    pub interval: Duration,
}

/// Outcome of one job run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped,
    Completed { processed: u64 },
}

/// Jobs configured for this process: one observer per configured worker
/// plus the housekeeping job.
pub fn configured_jobs(state: &DepotState) -> Vec<Job> {
    let queue = &state.config.queue;
    let housekeeping = &state.config.housekeeping;

    let mut jobs: Vec<Job> = (1..=queue.worker_count())
        .map(|n| Job {
            name: format!("{QUEUE_OBSERVER}_{n}"),
            kind: JobKind::QueueObserver,
            delay: queue.delay(),
            interval: queue.interval(),
        })
        .collect();
    jobs.push(Job {
        name: CLEAN_NOTIFICATIONS.to_string(),
        kind: JobKind::CleanNotifications {
            retention_days: housekeeping.retention_days,
        },
        delay: housekeeping.delay(),
        interval: housekeeping.interval(),
    });
    jobs
}

/// Run `job` once, recording the execution.
pub async fn run_once(state: &DepotState, job: &Job) -> Result<RunOutcome> {
    let mut info = state
        .schedules
        .get(&job.name)
        .await
        .with_context(|| format!("failed to read schedule {}", job.name))?
        .unwrap_or_else(|| ScheduleInfo::new(&job.name));
    if info.disabled {
        tracing::debug!(schedule = %job.name, "Schedule disabled, skipping run");
        return Ok(RunOutcome::Skipped);
    }

    let executed = depot_core::dates::now_millis();
    let started = Instant::now();
    let processed = match &job.kind {
        JobKind::QueueObserver => state.notifications.handle().await? as u64,
        JobKind::CleanNotifications { retention_days } => {
            state
                .notifications
                .delete_old_notifications(*retention_days)
                .await?
        }
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    let mut instance = ScheduleInstance::new(&job.name, executed);
    instance.duration_ms = Some(duration_ms);
    state
        .schedule_instances
        .insert(&instance)
        .await
        .with_context(|| format!("failed to record run of {}", job.name))?;

    info.last_executed = Some(executed);
    info.frequency_ms = Some(job.interval.as_millis() as u64);
    state
        .schedules
        .create_or_update(&info)
        .await
        .with_context(|| format!("failed to update schedule {}", job.name))?;

    if processed > 0 {
        tracing::info!(schedule = %job.name, processed, duration_ms, "Schedule run completed");
    }
    Ok(RunOutcome::Completed { processed })
}

/// Spawn `job` on its delay and interval. Failed runs are logged and the job
/// keeps its cadence.
pub fn spawn(state: DepotState, job: Job) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(job.delay).await;
        let mut ticker = tokio::time::interval(job.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = run_once(&state, &job).await {
                tracing::error!(schedule = %job.name, error = %e, "Schedule run failed");
            }
        }
    })
}

/// Spawn every configured job.
pub fn spawn_all(state: &DepotState) -> Vec<JoinHandle<()>> {
    configured_jobs(state)
        .into_iter()
        .map(|job| {
            tracing::info!(
                schedule = %job.name,
                delay_secs = job.delay.as_secs(),
                interval_secs = job.interval.as_secs(),
                "Schedule registered"
            );
            spawn(state.clone(), job)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::config::AppConfig;

    async fn state(workers: i64) -> DepotState {
        let mut config = AppConfig::for_testing();
        config.queue.workers = workers;
        let state = DepotState::open(config).await.unwrap();
        state.bootstrap().await.unwrap();
        state
    }

    #[tokio::test]
    async fn test_configured_jobs() {
        let state = state(3).await;
        let names: Vec<_> = configured_jobs(&state).into_iter().map(|j| j.name).collect();
        assert_eq!(
            names,
            vec![
                "queue-observer_1",
                "queue-observer_2",
                "queue-observer_3",
                "clean-notifications-schedule",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_records_instance_and_info() {
        let state = state(1).await;
        let job = configured_jobs(&state).remove(0);

        let outcome = run_once(&state, &job).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed { processed: 0 });
        run_once(&state, &job).await.unwrap();

        let instances = state.schedule_instances.find("queue-observer_1").await.unwrap();
        assert_eq!(instances.len(), 2);
        let info = state.schedules.get("queue-observer_1").await.unwrap().unwrap();
        assert!(info.last_executed.is_some());
        assert_eq!(info.frequency_ms, Some(job.interval.as_millis() as u64));
    }

    #[tokio::test]
    async fn test_disabled_schedule_is_skipped() {
        let state = state(1).await;
        let job = configured_jobs(&state).pop().unwrap();
        let mut info = ScheduleInfo::new(&job.name);
        info.disabled = true;
        state.schedules.create_or_update(&info).await.unwrap();

        assert_eq!(run_once(&state, &job).await.unwrap(), RunOutcome::Skipped);
        assert!(state.schedule_instances.find(&job.name).await.unwrap().is_empty());
    }
}
