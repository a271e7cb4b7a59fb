use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use batchline_core::{AppError, AppResult};
use batchline_domain::{IdRange, JobName, Lease, RunReport, WorkItem};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::batch_ports::{
    BacklogSource, Clock, CursorCheckpointStore, LeaseStore, RunReportSink, WorkItemExecutor,
};

pub(crate) struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestItem {
    pub(crate) id: i64,
}

impl WorkItem for TestItem {
    fn item_key(&self) -> String {
        format!("item:{}", self.id)
    }
}

pub(crate) struct FakeLeaseStore {
    clock: std::sync::Arc<ManualClock>,
    leases: Mutex<HashMap<String, Lease>>,
    create_delay: Duration,
    unavailable: AtomicBool,
    pub(crate) create_calls: AtomicUsize,
}

impl FakeLeaseStore {
    pub(crate) fn new(clock: std::sync::Arc<ManualClock>) -> Self {
        Self {
            clock,
            leases: Mutex::new(HashMap::new()),
            create_delay: Duration::ZERO,
            unavailable: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_create_delay(mut self, create_delay: Duration) -> Self {
        self.create_delay = create_delay;
        self
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) async fn holder_of(&self, key: &str) -> Option<String> {
        self.leases
            .lock()
            .await
            .get(key)
            .filter(|lease| lease.is_live_at(self.clock.now()))
            .map(|lease| lease.holder_token().to_owned())
    }

    pub(crate) async fn steal(&self, key: &JobName, holder_token: &str) {
        let lease = Lease::new(
            key.clone(),
            holder_token,
            self.clock.now() + chrono::Duration::hours(1),
        )
        .unwrap_or_else(|_| unreachable!());
        self.leases
            .lock()
            .await
            .insert(key.as_str().to_owned(), lease);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable(
                "simulated lease store outage".to_owned(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl LeaseStore for FakeLeaseStore {
    async fn try_create(
        &self,
        key: &JobName,
        holder_token: &str,
        ttl: Duration,
    ) -> AppResult<Option<Lease>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut leases = self.leases.lock().await;
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }

        let now = self.clock.now();
        if leases
            .get(key.as_str())
            .is_some_and(|lease| lease.is_live_at(now))
        {
            return Ok(None);
        }

        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| unreachable!());
        let lease = Lease::new(key.clone(), holder_token, now + ttl)?;
        leases.insert(key.as_str().to_owned(), lease.clone());
        Ok(Some(lease))
    }

    async fn compare_and_delete(&self, lease: &Lease) -> AppResult<bool> {
        self.check_available()?;

        let mut leases = self.leases.lock().await;
        let owned = leases
            .get(lease.key().as_str())
            .is_some_and(|stored| stored.holder_token() == lease.holder_token());
        if owned {
            leases.remove(lease.key().as_str());
        }

        Ok(owned)
    }

    async fn compare_and_renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>> {
        self.check_available()?;

        let mut leases = self.leases.lock().await;
        let Some(stored) = leases.get_mut(lease.key().as_str()) else {
            return Ok(None);
        };
        if stored.holder_token() != lease.holder_token() {
            return Ok(None);
        }

        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| unreachable!());
        *stored = stored.with_expiry(self.clock.now() + ttl);
        Ok(Some(stored.clone()))
    }
}

#[derive(Default)]
pub(crate) struct FakeBacklog {
    items: Mutex<BTreeMap<i64, TestItem>>,
    fail_fetch_at_call: Option<usize>,
    pub(crate) fetch_calls: AtomicUsize,
}

impl FakeBacklog {
    pub(crate) fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            items: Mutex::new(ids.into_iter().map(|id| (id, TestItem { id })).collect()),
            fail_fetch_at_call: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_at_fetch(mut self, call: usize) -> Self {
        self.fail_fetch_at_call = Some(call);
        self
    }
}

#[async_trait]
impl BacklogSource<TestItem> for FakeBacklog {
    async fn bounds(&self) -> AppResult<Option<IdRange>> {
        let items = self.items.lock().await;
        match (items.keys().next(), items.keys().next_back()) {
            (Some(first), Some(last)) => IdRange::covering(*first, *last).map(Some),
            _ => Ok(None),
        }
    }

    async fn fetch(&self, range: IdRange) -> AppResult<Vec<TestItem>> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_fetch_at_call == Some(call) {
            return Err(AppError::Unavailable(
                "simulated backlog query failure".to_owned(),
            ));
        }

        Ok(self
            .items
            .lock()
            .await
            .range(range.start()..range.end())
            .map(|(_, item)| item.clone())
            .collect())
    }
}

/// Executor modelled on "stop the environment only if it is still running".
#[derive(Default)]
pub(crate) struct FakeExecutor {
    running: Mutex<BTreeSet<i64>>,
    stopped: Mutex<BTreeSet<i64>>,
    failing: BTreeSet<i64>,
    panicking: BTreeSet<i64>,
    slow: BTreeSet<i64>,
    pub(crate) executions: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
    item_delay: Duration,
}

impl FakeExecutor {
    pub(crate) fn running(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            running: Mutex::new(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn failing_on(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing = ids.into_iter().collect();
        self
    }

    pub(crate) fn panicking_on(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.panicking = ids.into_iter().collect();
        self
    }

    pub(crate) fn slow_on(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.slow = ids.into_iter().collect();
        self
    }

    pub(crate) fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub(crate) async fn stopped_ids(&self) -> Vec<i64> {
        self.stopped.lock().await.iter().copied().collect()
    }

    pub(crate) async fn running_ids(&self) -> Vec<i64> {
        self.running.lock().await.iter().copied().collect()
    }
}

#[async_trait]
impl WorkItemExecutor<TestItem> for FakeExecutor {
    async fn execute(&self, item: &TestItem) -> AppResult<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.item_delay.is_zero() {
            tokio::time::sleep(self.item_delay).await;
        }
        if self.slow.contains(&item.id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&item.id) {
            panic!("simulated executor panic for item {}", item.id);
        }
        if self.failing.contains(&item.id) {
            return Err(AppError::Internal(format!(
                "simulated failure for item {}",
                item.id
            )));
        }

        if self.running.lock().await.remove(&item.id) {
            self.stopped.lock().await.insert(item.id);
        }

        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCheckpoints {
    pub(crate) positions: Mutex<HashMap<String, i64>>,
    pub(crate) saves: Mutex<Vec<i64>>,
}

#[async_trait]
impl CursorCheckpointStore for InMemoryCheckpoints {
    async fn load(&self, job_name: &JobName) -> AppResult<Option<i64>> {
        Ok(self.positions.lock().await.get(job_name.as_str()).copied())
    }

    async fn save(&self, job_name: &JobName, next_lower_bound: i64) -> AppResult<()> {
        self.saves.lock().await.push(next_lower_bound);
        self.positions
            .lock()
            .await
            .insert(job_name.as_str().to_owned(), next_lower_bound);
        Ok(())
    }

    async fn clear(&self, job_name: &JobName) -> AppResult<()> {
        self.positions.lock().await.remove(job_name.as_str());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) reports: Mutex<Vec<RunReport>>,
    pub(crate) fail: bool,
}

#[async_trait]
impl RunReportSink for RecordingSink {
    async fn publish(&self, report: &RunReport) -> AppResult<()> {
        self.reports.lock().await.push(report.clone());
        if self.fail {
            return Err(AppError::Unavailable("sink offline".to_owned()));
        }

        Ok(())
    }
}

pub(crate) fn job_name(value: &str) -> JobName {
    JobName::new(value).unwrap_or_else(|_| unreachable!())
}
