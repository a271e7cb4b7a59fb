use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{CoordinatorState, IdRange, JobName, RunOutcome};
use chrono::Utc;

use crate::batch_ports::{BacklogSource, WorkItemExecutor};
use crate::cursor_strategy::CursorStrategy;
use crate::idempotent_dispatcher::IdempotentDispatcher;
use crate::lease_manager::{LeaseAcquisition, LeaseManager};
use crate::loop_governor::LoopGovernor;
use crate::test_fakes::{
    FakeBacklog, FakeExecutor, FakeLeaseStore, InMemoryCheckpoints, ManualClock, RecordingSink,
    TestItem, job_name,
};

use super::{BatchCoordinator, CoordinatorSettings};

const JOB: &str = "environments_auto_stop";

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<FakeLeaseStore>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(FakeLeaseStore::new(clock.clone()));
        Self { clock, store }
    }

    fn with_store(store: FakeLeaseStore, clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            store: Arc::new(store),
        }
    }

    fn coordinator(
        &self,
        holder_id: &str,
        settings: CoordinatorSettings,
        backlog: Arc<dyn BacklogSource<TestItem>>,
        executor: Arc<dyn WorkItemExecutor<TestItem>>,
    ) -> BatchCoordinator<TestItem> {
        let lease_manager = LeaseManager::new(self.store.clone(), holder_id)
            .unwrap_or_else(|_| unreachable!())
            .with_retry_backoff(Duration::from_millis(1));
        let dispatcher = IdempotentDispatcher::new(executor, 8, Duration::from_secs(30))
            .unwrap_or_else(|_| unreachable!());

        BatchCoordinator::new(
            job_name(JOB),
            settings,
            lease_manager,
            LoopGovernor::new(self.clock.clone()),
            backlog,
            dispatcher,
            self.clock.clone(),
        )
        .unwrap_or_else(|_| unreachable!())
    }
}

fn full_run_transitions() -> Vec<CoordinatorState> {
    vec![
        CoordinatorState::Idle,
        CoordinatorState::Acquiring,
        CoordinatorState::Running,
        CoordinatorState::Releasing,
        CoordinatorState::Idle,
    ]
}

/// Executor that hands the lease to another holder while processing one item.
struct LeaseStealingExecutor {
    store: Arc<FakeLeaseStore>,
    key: JobName,
    steal_on: i64,
}

#[async_trait]
impl WorkItemExecutor<TestItem> for LeaseStealingExecutor {
    async fn execute(&self, item: &TestItem) -> AppResult<()> {
        if item.id == self.steal_on {
            self.store.steal(&self.key, "intruder:token").await;
        }

        Ok(())
    }
}

/// Executor whose items each take simulated wall-clock time.
struct ClockAdvancingExecutor {
    clock: Arc<ManualClock>,
    per_item: chrono::Duration,
}

#[async_trait]
impl WorkItemExecutor<TestItem> for ClockAdvancingExecutor {
    async fn execute(&self, _item: &TestItem) -> AppResult<()> {
        self.clock.advance(self.per_item);
        Ok(())
    }
}

/// Executor that jumps the clock past the lease expiry on one item and
/// optionally lets a second worker claim the job at that moment.
struct ExpiringLeaseExecutor {
    clock: Arc<ManualClock>,
    jump_on: i64,
    jump: chrono::Duration,
    intruder: Option<LeaseManager>,
    intruder_acquired: AtomicBool,
}

#[async_trait]
impl WorkItemExecutor<TestItem> for ExpiringLeaseExecutor {
    async fn execute(&self, item: &TestItem) -> AppResult<()> {
        if item.id != self.jump_on {
            return Ok(());
        }

        self.clock.advance(self.jump);
        if let Some(intruder) = &self.intruder {
            let acquisition = intruder
                .acquire(&job_name(JOB), Duration::from_secs(50 * 60), 0)
                .await;
            self.intruder_acquired.store(
                matches!(acquisition, LeaseAcquisition::Acquired(_)),
                Ordering::SeqCst,
            );
        }

        Ok(())
    }
}

/// Backlog whose bounds query takes simulated wall-clock time.
struct SlowBoundsBacklog {
    inner: FakeBacklog,
    clock: Arc<ManualClock>,
    delay: chrono::Duration,
}

#[async_trait]
impl BacklogSource<TestItem> for SlowBoundsBacklog {
    async fn bounds(&self) -> AppResult<Option<IdRange>> {
        self.clock.advance(self.delay);
        self.inner.bounds().await
    }

    async fn fetch(&self, range: IdRange) -> AppResult<Vec<TestItem>> {
        self.inner.fetch(range).await
    }
}

struct PanickingBacklog;

#[async_trait]
impl BacklogSource<TestItem> for PanickingBacklog {
    async fn bounds(&self) -> AppResult<Option<IdRange>> {
        IdRange::new(1, 10).map(Some)
    }

    async fn fetch(&self, _range: IdRange) -> AppResult<Vec<TestItem>> {
        panic!("backlog driver crashed");
    }
}

#[tokio::test]
async fn drains_250_items_in_three_batches() {
    let harness = Harness::new();
    let backlog = Arc::new(FakeBacklog::with_ids(1..=250));
    let executor = Arc::new(FakeExecutor::running(1..=250));
    let coordinator = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        backlog.clone(),
        executor.clone(),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.items_processed, 250);
    assert_eq!(report.failed_items, 0);
    assert_eq!(report.error, None);
    assert_eq!(report.transitions, full_run_transitions());
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 3);
    assert!(executor.running_ids().await.is_empty());
    assert!(harness.store.holder_of(JOB).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn concurrent_invocations_are_mutually_exclusive() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = FakeLeaseStore::new(clock.clone()).with_create_delay(Duration::from_millis(10));
    let harness = Harness::with_store(store, clock);
    let backlog = Arc::new(FakeBacklog::with_ids(1..=40));
    let executor =
        Arc::new(FakeExecutor::running(1..=40).with_item_delay(Duration::from_millis(100)));
    let first = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        backlog.clone(),
        executor.clone(),
    );
    let second = harness.coordinator(
        "worker-b",
        CoordinatorSettings::default(),
        backlog.clone(),
        executor.clone(),
    );

    let (first_report, second_report) = tokio::join!(first.execute(), second.execute());

    let mut outcomes = [first_report.outcome, second_report.outcome];
    outcomes.sort_by_key(|outcome| outcome.as_str());
    assert_eq!(outcomes, [RunOutcome::Busy, RunOutcome::Exhausted]);
    assert_eq!(executor.executions.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn busy_invocation_skips_the_backlog() {
    let harness = Harness::new();
    harness.store.steal(&job_name(JOB), "other:token").await;
    let backlog = Arc::new(FakeBacklog::with_ids(1..=10));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            backlog.clone(),
            Arc::new(FakeExecutor::default()),
        )
        .with_report_sink(sink.clone());

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Busy);
    assert_eq!(
        report.transitions,
        vec![
            CoordinatorState::Idle,
            CoordinatorState::Acquiring,
            CoordinatorState::Idle
        ]
    );
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 0);
    let published = sink.reports.lock().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].outcome, RunOutcome::Busy);
}

#[tokio::test]
async fn backlog_failure_fails_the_run_and_releases_the_lease() {
    let harness = Harness::new();
    let backlog = Arc::new(FakeBacklog::with_ids(1..=250).failing_at_fetch(2));
    let coordinator = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        backlog,
        Arc::new(FakeExecutor::running(1..=250)),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.items_processed, 100);
    assert_eq!(report.iterations, 2);
    assert!(
        report
            .error
            .as_deref()
            .is_some_and(|error| error.contains("simulated backlog query failure"))
    );
    assert_eq!(report.transitions, full_run_transitions());
    assert!(harness.store.holder_of(JOB).await.is_none());
}

#[tokio::test]
async fn checkpoint_advances_only_after_confirmed_batches() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    let executor = Arc::new(FakeExecutor::running(1..=250));

    let failing = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            Arc::new(FakeBacklog::with_ids(1..=250).failing_at_fetch(2)),
            executor.clone(),
        )
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));
    let failed = failing.execute().await;

    assert_eq!(failed.outcome, RunOutcome::Failed);
    assert_eq!(*checkpoints.saves.lock().await, vec![101]);
    assert_eq!(checkpoints.positions.lock().await.get(JOB), Some(&101));

    let resumed = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            Arc::new(FakeBacklog::with_ids(1..=250)),
            executor.clone(),
        )
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));
    let report = resumed.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.items_processed, 150);
    assert_eq!(report.iterations, 2);
    assert_eq!(executor.executions.load(Ordering::SeqCst), 250);
    assert!(checkpoints.positions.lock().await.is_empty());
}

#[tokio::test]
async fn kept_lease_blocks_the_next_trigger() {
    let harness = Harness::new();
    let settings = CoordinatorSettings {
        release_lease_on_exit: false,
        ..CoordinatorSettings::default()
    };
    let coordinator = harness.coordinator(
        "worker-a",
        settings.clone(),
        Arc::new(FakeBacklog::with_ids(1..=5)),
        Arc::new(FakeExecutor::running(1..=5)),
    );
    let next = harness.coordinator(
        "worker-b",
        settings,
        Arc::new(FakeBacklog::with_ids(1..=5)),
        Arc::new(FakeExecutor::running(1..=5)),
    );

    let report = coordinator.execute().await;
    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert!(
        harness
            .store
            .holder_of(JOB)
            .await
            .is_some_and(|holder| holder.starts_with("worker-a:"))
    );

    assert_eq!(next.execute().await.outcome, RunOutcome::Busy);

    harness.clock.advance(chrono::Duration::minutes(51));
    assert_eq!(next.execute().await.outcome, RunOutcome::Exhausted);
}

#[tokio::test]
async fn lost_lease_aborts_before_the_batch_is_committed() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    let backlog = Arc::new(FakeBacklog::with_ids(1..=250));
    let executor = Arc::new(LeaseStealingExecutor {
        store: harness.store.clone(),
        key: job_name(JOB),
        steal_on: 50,
    });
    let coordinator = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            backlog.clone(),
            executor,
        )
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.items_processed, 100);
    assert!(
        report
            .error
            .as_deref()
            .is_some_and(|error| error.contains("was lost during batch 1"))
    );
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 1);
    assert!(checkpoints.saves.lock().await.is_empty());
    assert_eq!(
        harness.store.holder_of(JOB).await.as_deref(),
        Some("intruder:token")
    );
}

#[tokio::test]
async fn lease_taken_over_mid_batch_fails_without_committing() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    let backlog = Arc::new(FakeBacklog::with_ids(1..=30));
    let intruder = LeaseManager::new(harness.store.clone(), "worker-b")
        .unwrap_or_else(|_| unreachable!());
    let executor = Arc::new(ExpiringLeaseExecutor {
        clock: harness.clock.clone(),
        jump_on: 1,
        jump: chrono::Duration::minutes(51),
        intruder: Some(intruder),
        intruder_acquired: AtomicBool::new(false),
    });
    let settings = CoordinatorSettings {
        batch_size: 10,
        ..CoordinatorSettings::default()
    };
    let coordinator = harness
        .coordinator("worker-a", settings, backlog.clone(), executor.clone())
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));

    let report = coordinator.execute().await;

    assert!(executor.intruder_acquired.load(Ordering::SeqCst));
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(
        report
            .error
            .as_deref()
            .is_some_and(|error| error.contains("was lost during batch 1"))
    );
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 1);
    assert!(checkpoints.saves.lock().await.is_empty());
    assert!(
        harness
            .store
            .holder_of(JOB)
            .await
            .is_some_and(|holder| holder.starts_with("worker-b:"))
    );
}

#[tokio::test]
async fn expired_lease_without_renewal_fails_without_committing() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    let backlog = Arc::new(FakeBacklog::with_ids(1..=30));
    let executor = Arc::new(ExpiringLeaseExecutor {
        clock: harness.clock.clone(),
        jump_on: 1,
        jump: chrono::Duration::minutes(51),
        intruder: None,
        intruder_acquired: AtomicBool::new(false),
    });
    let settings = CoordinatorSettings {
        batch_size: 10,
        renew_lease_each_batch: false,
        ..CoordinatorSettings::default()
    };
    let coordinator = harness
        .coordinator("worker-a", settings, backlog.clone(), executor)
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(
        report
            .error
            .as_deref()
            .is_some_and(|error| error.contains("was lost during batch 1"))
    );
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 1);
    assert!(checkpoints.saves.lock().await.is_empty());
}

#[tokio::test]
async fn sparse_backlog_walks_empty_batches() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    let backlog = Arc::new(FakeBacklog::with_ids([1, 450]));
    let executor = Arc::new(FakeExecutor::running([1, 450]));
    let coordinator = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            backlog.clone(),
            executor.clone(),
        )
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.items_processed, 2);
    assert_eq!(report.failed_items, 0);
    assert_eq!(report.error, None);
    assert_eq!(backlog.fetch_calls.load(Ordering::SeqCst), 5);
    assert_eq!(executor.executions.load(Ordering::SeqCst), 2);
    assert_eq!(
        *checkpoints.saves.lock().await,
        vec![101, 201, 301, 401, 451]
    );
    assert_eq!(executor.stopped_ids().await, vec![1, 450]);
}

#[tokio::test]
async fn deadline_is_measured_from_loop_start() {
    let harness = Harness::new();
    let backlog = Arc::new(SlowBoundsBacklog {
        inner: FakeBacklog::with_ids(1..=250),
        clock: harness.clock.clone(),
        delay: chrono::Duration::minutes(5),
    });
    let coordinator = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        backlog,
        Arc::new(FakeExecutor::running(1..=250)),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.items_processed, 250);
    assert_eq!(report.duration_ms, 300_000);
}

#[tokio::test]
async fn failing_item_does_not_abort_the_loop() {
    let harness = Harness::new();
    let coordinator = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        Arc::new(FakeBacklog::with_ids(1..=250)),
        Arc::new(FakeExecutor::running(1..=250).failing_on([5])),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.items_processed, 249);
    assert_eq!(report.failed_items, 1);
}

#[tokio::test]
async fn slow_batches_time_out_with_work_remaining() {
    let harness = Harness::new();
    let settings = CoordinatorSettings {
        batch_size: 10,
        timeout: Duration::from_secs(4 * 60),
        ..CoordinatorSettings::default()
    };
    let coordinator = harness.coordinator(
        "worker-a",
        settings,
        Arc::new(FakeBacklog::with_ids(1..=50)),
        Arc::new(ClockAdvancingExecutor {
            clock: harness.clock.clone(),
            per_item: chrono::Duration::seconds(10),
        }),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::TimedOut);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.items_processed, 30);
    assert_eq!(report.duration_ms, 300_000);
    assert!(harness.store.holder_of(JOB).await.is_none());
}

#[tokio::test]
async fn iteration_cap_completes_with_work_remaining() {
    let harness = Harness::new();
    let settings = CoordinatorSettings {
        max_iterations: 2,
        ..CoordinatorSettings::default()
    };
    let coordinator = harness.coordinator(
        "worker-a",
        settings,
        Arc::new(FakeBacklog::with_ids(1..=250)),
        Arc::new(FakeExecutor::running(1..=250)),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.iterations, 2);
    assert_eq!(report.items_processed, 200);
}

#[tokio::test]
async fn empty_backlog_is_exhausted_immediately() {
    let harness = Harness::new();
    let checkpoints = Arc::new(InMemoryCheckpoints::default());
    checkpoints
        .positions
        .lock()
        .await
        .insert(JOB.to_owned(), 42);
    let coordinator = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            Arc::new(FakeBacklog::default()),
            Arc::new(FakeExecutor::default()),
        )
        .with_cursor_strategy(CursorStrategy::Checkpointed(checkpoints.clone()));

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.iterations, 0);
    assert!(checkpoints.positions.lock().await.is_empty());
}

#[tokio::test]
async fn panic_inside_the_run_is_reported_as_failed() {
    let harness = Harness::new();
    let coordinator = harness.coordinator(
        "worker-a",
        CoordinatorSettings::default(),
        Arc::new(PanickingBacklog),
        Arc::new(FakeExecutor::default()),
    );

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(
        report
            .error
            .as_deref()
            .is_some_and(|error| error.contains("backlog driver crashed"))
    );
    assert_eq!(report.transitions, full_run_transitions());
    assert!(harness.store.holder_of(JOB).await.is_none());
}

#[tokio::test]
async fn sink_failure_does_not_change_the_report() {
    let harness = Harness::new();
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..RecordingSink::default()
    });
    let coordinator = harness
        .coordinator(
            "worker-a",
            CoordinatorSettings::default(),
            Arc::new(FakeBacklog::with_ids(1..=3)),
            Arc::new(FakeExecutor::running(1..=3)),
        )
        .with_report_sink(sink.clone());

    let report = coordinator.execute().await;

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(sink.reports.lock().await.len(), 1);
}

#[test]
fn settings_reject_zero_batch_size() {
    let settings = CoordinatorSettings {
        batch_size: 0,
        ..CoordinatorSettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn settings_require_ttl_above_timeout_in_both_renewal_modes() {
    let renewing = CoordinatorSettings {
        batch_size: 10,
        lease_ttl: Duration::from_secs(60),
        timeout: Duration::from_secs(240),
        renew_lease_each_batch: true,
        ..CoordinatorSettings::default()
    };
    assert!(
        renewing
            .validate()
            .is_err_and(|error| error.to_string().contains("lease_ttl"))
    );

    let non_renewing = CoordinatorSettings {
        renew_lease_each_batch: false,
        ..renewing
    };
    assert!(non_renewing.validate().is_err());
}

#[test]
fn lease_must_cover_the_slowest_batch() {
    let renewing = CoordinatorSettings {
        batch_size: 100,
        timeout: Duration::from_secs(4 * 60),
        lease_ttl: Duration::from_secs(6 * 60),
        ..CoordinatorSettings::default()
    };
    // 13 waves of 8 items at 30s each
    assert!(renewing.validate().is_ok());
    assert!(
        renewing
            .validate_batch_window(8, Duration::from_secs(30))
            .is_err()
    );

    let roomy = CoordinatorSettings {
        lease_ttl: Duration::from_secs(10 * 60),
        ..renewing.clone()
    };
    assert!(roomy.validate_batch_window(8, Duration::from_secs(30)).is_ok());

    let non_renewing = CoordinatorSettings {
        renew_lease_each_batch: false,
        ..roomy.clone()
    };
    assert!(
        non_renewing
            .validate_batch_window(8, Duration::from_secs(30))
            .is_err()
    );

    let non_renewing_roomy = CoordinatorSettings {
        lease_ttl: Duration::from_secs(11 * 60),
        ..non_renewing
    };
    assert!(
        non_renewing_roomy
            .validate_batch_window(8, Duration::from_secs(30))
            .is_ok()
    );
}

#[test]
fn coordinator_rejects_lease_shorter_than_a_batch() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(FakeLeaseStore::new(clock.clone()));
    let lease_manager =
        LeaseManager::new(store, "worker-a").unwrap_or_else(|_| unreachable!());
    let dispatcher = IdempotentDispatcher::<TestItem>::new(
        Arc::new(FakeExecutor::default()),
        1,
        Duration::from_secs(60),
    )
    .unwrap_or_else(|_| unreachable!());
    let settings = CoordinatorSettings {
        batch_size: 10,
        timeout: Duration::from_secs(60),
        lease_ttl: Duration::from_secs(5 * 60),
        ..CoordinatorSettings::default()
    };

    let result = BatchCoordinator::<TestItem>::new(
        job_name(JOB),
        settings,
        lease_manager,
        LoopGovernor::new(clock.clone()),
        Arc::new(FakeBacklog::with_ids(1..=10)),
        dispatcher,
        clock,
    );

    assert!(result.is_err_and(|error| error.to_string().contains("lease_ttl (300s)")));
}
