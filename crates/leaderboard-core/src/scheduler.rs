//! Refresh scheduler: keeps the leaderboard rows current
//!
//! The scheduler owns the authoritative [`RawDataset`] and the filter text.
//! A single actor task polls the [`DataSource`] on a fixed period and applies
//! commands (filter changes, manual retry, connectivity changes) in arrival
//! order. Observers read immutable [`RefreshSnapshot`]s from a watch channel.
//!
//! Lifecycle of one refresh: `Idle -> Fetching -> {Succeeded, Failed} -> Idle`.
//! A failed refresh keeps the previous dataset and rows and raises an error
//! flag that stays up until the next success. Timer ticks and retries that
//! arrive while a fetch is outstanding are ignored, so datasets are always
//! applied in request order.

use crate::projector::project;
use crate::source::DataSource;
use crate::types::{DisplayRow, RawDataset};
use crate::{Error, Result};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default refresh period
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(60_000);

/// Longest accepted refresh period
pub const MAX_REFRESH_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Check that `period` is usable as a refresh cadence
pub fn validate_period(period: Duration) -> Result<()> {
    if period.is_zero() {
        return Err(Error::config("Refresh interval must be > 0"));
    }
    if period > MAX_REFRESH_PERIOD {
        return Err(Error::config(format!(
            "Refresh interval must be at most {:?}, got {:?}",
            MAX_REFRESH_PERIOD, period
        )));
    }
    Ok(())
}

/// Whether a fetch is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Idle,
    Fetching,
}

/// Result of the most recent completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Succeeded,
    Failed,
}

/// What presentation surfaces see
#[derive(Debug, Clone)]
pub struct RefreshSnapshot {
    pub phase: FetchPhase,
    pub last_outcome: Option<FetchOutcome>,
    /// Latest successfully fetched dataset
    pub dataset: Option<Arc<RawDataset>>,
    /// Filter text the rows were projected with
    pub filter: String,
    pub rows: Arc<Vec<DisplayRow>>,
    /// Set after a failed fetch, cleared by the next success
    pub error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    /// Number of datasets applied so far
    pub generation: u64,
    /// Number of fetches started so far
    pub attempts: u64,
    pub online: bool,
}

impl RefreshSnapshot {
    /// Whether the surface should show its error sub-state
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether any dataset has been applied yet
    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// Number of nodes in the current dataset
    pub fn node_count(&self) -> usize {
        self.dataset.as_ref().map(|d| d.len()).unwrap_or(0)
    }
}

/// Transition logic of the scheduler, free of timers and tasks
#[derive(Debug, Clone)]
pub struct RefreshState {
    dataset: Option<Arc<RawDataset>>,
    filter: String,
    rows: Arc<Vec<DisplayRow>>,
    phase: FetchPhase,
    last_outcome: Option<FetchOutcome>,
    error: Option<String>,
    last_success: Option<DateTime<Utc>>,
    last_attempt: Option<DateTime<Utc>>,
    generation: u64,
    attempts: u64,
    online: bool,
}

impl RefreshState {
    /// Create a state, optionally seeded with an initial dataset
    pub fn new(initial: Option<RawDataset>, filter: impl Into<String>) -> Self {
        let mut state = Self {
            dataset: None,
            filter: filter.into(),
            rows: Arc::new(Vec::new()),
            phase: FetchPhase::Idle,
            last_outcome: None,
            error: None,
            last_success: None,
            last_attempt: None,
            generation: 0,
            attempts: 0,
            online: true,
        };

        if let Some(dataset) = initial {
            state.dataset = Some(Arc::new(dataset));
            state.generation = 1;
            state.last_success = Some(Utc::now());
            state.reproject();
        }

        state
    }

    /// Enter `Fetching`. Returns false when a fetch is already outstanding.
    pub fn begin_fetch(&mut self) -> bool {
        if self.phase == FetchPhase::Fetching {
            return false;
        }
        self.phase = FetchPhase::Fetching;
        self.attempts += 1;
        self.last_attempt = Some(Utc::now());
        true
    }

    /// Apply the result of the outstanding fetch and return to `Idle`
    pub fn complete_fetch(&mut self, result: Result<RawDataset>) {
        self.phase = FetchPhase::Idle;

        match result {
            Ok(dataset) => {
                self.dataset = Some(Arc::new(dataset));
                self.generation += 1;
                self.last_outcome = Some(FetchOutcome::Succeeded);
                self.last_success = Some(Utc::now());
                self.error = None;
                self.reproject();
            }
            Err(e) => {
                self.last_outcome = Some(FetchOutcome::Failed);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Replace the filter text. Returns true when it changed.
    pub fn set_filter(&mut self, filter: impl Into<String>) -> bool {
        let filter = filter.into();
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.reproject();
        true
    }

    /// Record connectivity. Returns true on an offline to online transition.
    pub fn set_online(&mut self, online: bool) -> bool {
        let reconnected = online && !self.online;
        self.online = online;
        reconnected
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn snapshot(&self) -> RefreshSnapshot {
        RefreshSnapshot {
            phase: self.phase,
            last_outcome: self.last_outcome,
            dataset: self.dataset.clone(),
            filter: self.filter.clone(),
            rows: self.rows.clone(),
            error: self.error.clone(),
            last_success: self.last_success,
            last_attempt: self.last_attempt,
            generation: self.generation,
            attempts: self.attempts,
            online: self.online,
        }
    }

    fn reproject(&mut self) {
        self.rows = match &self.dataset {
            Some(dataset) => Arc::new(project(dataset, &self.filter)),
            None => Arc::new(Vec::new()),
        };
    }
}

#[derive(Debug)]
enum Command {
    SetFilter(String),
    Retry,
    Connectivity(bool),
    Shutdown,
}

/// Builder and actor for the refresh loop
pub struct RefreshScheduler {
    source: Arc<dyn DataSource>,
    period: Duration,
    refetch_on_reconnect: bool,
    initial: Option<RawDataset>,
    filter: String,
}

impl RefreshScheduler {
    /// Create a scheduler polling `source` every `period`.
    ///
    /// Fails when `period` is zero or longer than [`MAX_REFRESH_PERIOD`].
    pub fn new(source: Arc<dyn DataSource>, period: Duration) -> Result<Self> {
        validate_period(period)?;
        Ok(Self {
            source,
            period,
            refetch_on_reconnect: true,
            initial: None,
            filter: String::new(),
        })
    }

    /// Seed the scheduler with already fetched data; the first poll then
    /// waits one full period.
    pub fn with_initial_dataset(mut self, dataset: RawDataset) -> Self {
        self.initial = Some(dataset);
        self
    }

    /// Initial filter text
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Fetch immediately when connectivity comes back
    pub fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
        self.refetch_on_reconnect = enabled;
        self
    }

    /// Start the actor task on the current runtime
    pub fn spawn(mut self) -> RefreshHandle {
        let state = RefreshState::new(self.initial.take(), std::mem::take(&mut self.filter));
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!(
            "Starting leaderboard refresh every {:?} from {}",
            self.period,
            self.source.describe()
        );

        let task = tokio::spawn(self.run(state, command_rx, snapshot_tx));

        RefreshHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Arc::new(task),
        }
    }

    async fn run(
        self,
        mut state: RefreshState,
        mut commands: mpsc::UnboundedReceiver<Command>,
        snapshots: watch::Sender<RefreshSnapshot>,
    ) {
        let now = Instant::now();
        let first_tick = if state.snapshot().is_loaded() {
            now.checked_add(self.period).unwrap_or(now)
        } else {
            now
        };
        let mut ticker = interval_at(first_tick, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (done_tx, mut done_rx) = mpsc::channel::<Result<RawDataset>>(1);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.start_fetch(&mut state, &done_tx, &snapshots, "timer");
                }
                Some(result) = done_rx.recv() => {
                    match &result {
                        Ok(dataset) => info!("Leaderboard refreshed: {} nodes", dataset.len()),
                        Err(e) => warn!(
                            "Leaderboard refresh failed ({}), keeping previous data: {}",
                            e.category(),
                            e
                        ),
                    }
                    state.complete_fetch(result);
                    snapshots.send_replace(state.snapshot());
                }
                command = commands.recv() => match command {
                    Some(Command::SetFilter(filter)) => {
                        if state.set_filter(filter) {
                            snapshots.send_replace(state.snapshot());
                        }
                    }
                    Some(Command::Retry) => {
                        self.start_fetch(&mut state, &done_tx, &snapshots, "retry");
                    }
                    Some(Command::Connectivity(online)) => {
                        let reconnected = state.set_online(online);
                        snapshots.send_replace(state.snapshot());
                        if reconnected && self.refetch_on_reconnect {
                            self.start_fetch(&mut state, &done_tx, &snapshots, "reconnect");
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        info!("Leaderboard refresh stopped");
    }

    fn start_fetch(
        &self,
        state: &mut RefreshState,
        done_tx: &mpsc::Sender<Result<RawDataset>>,
        snapshots: &watch::Sender<RefreshSnapshot>,
        reason: &str,
    ) {
        if !state.begin_fetch() {
            debug!("Ignoring {} refresh while a fetch is outstanding", reason);
            return;
        }
        debug!("Starting {} refresh", reason);
        snapshots.send_replace(state.snapshot());

        let source = self.source.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch().await;
            let _ = done_tx.send(result).await;
        });
    }
}

/// Cloneable handle to a running scheduler
#[derive(Clone)]
pub struct RefreshHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<RefreshSnapshot>,
    task: Arc<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Replace the filter text; rows are re-projected immediately
    pub fn set_filter(&self, filter: impl Into<String>) {
        self.send(Command::SetFilter(filter.into()));
    }

    /// Fetch now, outside the timer cadence
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Report connectivity changes from the host environment
    pub fn set_online(&self, online: bool) {
        self.send(Command::Connectivity(online));
    }

    /// Stop the refresh loop
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> RefreshSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot> {
        self.snapshots.clone()
    }

    /// Whether the actor task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Refresh loop already stopped, dropping command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, RawNodeRecord, Task};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const PERIOD: Duration = Duration::from_secs(60);

    fn dataset(nodes: &[(&str, f64)]) -> RawDataset {
        nodes
            .iter()
            .map(|(node, mean)| {
                (
                    NodeId::from(*node),
                    RawNodeRecord::new().with_metric(Task::Average, *mean, 0.01),
                )
            })
            .collect()
    }

    /// Replays scripted results, one per fetch
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<RawDataset>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<RawDataset>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(results: Vec<Result<RawDataset>>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(results)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn fetch(&self) -> Result<RawDataset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::fetch("script exhausted")))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[test]
    fn test_failure_keeps_previous_dataset() {
        let mut state = RefreshState::new(None, "");

        assert!(state.begin_fetch());
        state.complete_fetch(Ok(dataset(&[("node1", 0.8), ("node2", 0.6)])));
        let good = state.snapshot();
        assert_eq!(good.rows.len(), 2);
        assert!(!good.is_error());
        assert_eq!(good.last_outcome, Some(FetchOutcome::Succeeded));

        assert!(state.begin_fetch());
        state.complete_fetch(Err(Error::fetch("connection reset")));
        let stale = state.snapshot();

        assert!(stale.is_error());
        assert_eq!(stale.last_outcome, Some(FetchOutcome::Failed));
        assert_eq!(stale.phase, FetchPhase::Idle);
        assert_eq!(stale.generation, 1);
        assert_eq!(stale.rows, good.rows);
        assert!(Arc::ptr_eq(
            stale.dataset.as_ref().unwrap(),
            good.dataset.as_ref().unwrap()
        ));

        // Filtering still works against the stale dataset
        state.set_filter("node2");
        assert_eq!(state.rows().len(), 1);
        assert!(state.snapshot().is_error());

        // The next success clears the error
        assert!(state.begin_fetch());
        state.complete_fetch(Ok(dataset(&[("node3", 0.1)])));
        let recovered = state.snapshot();
        assert!(!recovered.is_error());
        assert_eq!(recovered.generation, 2);
        assert!(recovered.rows.is_empty());
    }

    #[test]
    fn test_overlapping_fetch_is_refused() {
        let mut state = RefreshState::new(None, "");
        assert!(state.begin_fetch());
        assert_eq!(state.phase(), FetchPhase::Fetching);
        assert!(!state.begin_fetch());
        assert_eq!(state.snapshot().attempts, 1);

        state.complete_fetch(Ok(RawDataset::new()));
        assert_eq!(state.phase(), FetchPhase::Idle);
        assert!(state.begin_fetch());
    }

    #[test]
    fn test_latest_filter_wins_over_pending_fetch() {
        let mut state = RefreshState::new(None, "");
        assert!(state.begin_fetch());

        assert!(state.set_filter("node1"));
        assert!(state.set_filter("node2, node3"));
        assert!(!state.set_filter("node2, node3"));

        state.complete_fetch(Ok(dataset(&[("node1", 0.5), ("node2", 0.6), ("node3", 0.7)])));

        let nodes: Vec<&str> = state.rows().iter().map(|r| r.node.as_str()).collect();
        assert_eq!(nodes, vec!["node2", "node3"]);
        assert_eq!(state.snapshot().filter, "node2, node3");
    }

    #[test]
    fn test_initial_dataset_is_projected() {
        let state = RefreshState::new(Some(dataset(&[("node1", 0.5), ("node2", 0.6)])), "node1");
        let snapshot = state.snapshot();
        assert!(snapshot.is_loaded());
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.node_count(), 2);
    }

    #[test]
    fn test_connectivity_transitions() {
        let mut state = RefreshState::new(None, "");
        assert!(!state.set_online(true));
        assert!(!state.set_online(false));
        assert!(!state.snapshot().online);
        assert!(state.set_online(true));
        assert!(!state.set_online(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_fixed_period() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(dataset(&[("node1", 0.5)])),
            Ok(dataset(&[("node1", 0.5), ("node2", 0.7)])),
        ]));
        let started = Instant::now();
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.generation == 1).await.unwrap();
        assert!(started.elapsed() < PERIOD);
        assert_eq!(handle.snapshot().rows.len(), 1);

        rx.wait_for(|s| s.generation == 2).await.unwrap();
        assert!(started.elapsed() >= PERIOD);
        assert_eq!(handle.snapshot().rows.len(), 2);
        assert_eq!(source.calls(), 2);

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_stale_rows() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(dataset(&[("node1", 0.5), ("node2", 0.7)])),
            Err(Error::fetch("endpoint down")),
        ]));
        let handle = RefreshScheduler::new(source, PERIOD)
            .unwrap()
            .spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.generation == 1).await.unwrap();
        let before = handle.snapshot();

        rx.wait_for(|s| s.is_error()).await.unwrap();
        let after = handle.snapshot();
        assert_eq!(after.generation, 1);
        assert_eq!(after.rows, before.rows);
        assert!(after.error.as_deref().unwrap().contains("endpoint down"));

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fetches_immediately() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(Error::parse("truncated body")),
            Ok(dataset(&[("node1", 0.5)])),
        ]));
        let started = Instant::now();
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.is_error() && s.phase == FetchPhase::Idle)
            .await
            .unwrap();
        assert!(!handle.snapshot().is_loaded());

        handle.retry();
        rx.wait_for(|s| s.generation == 1).await.unwrap();

        assert!(started.elapsed() < PERIOD);
        assert!(!handle.snapshot().is_error());
        assert_eq!(source.calls(), 2);

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_ignored_while_fetch_outstanding() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(
            vec![Ok(dataset(&[("node1", 0.5)]))],
            gate.clone(),
        ));
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.phase == FetchPhase::Fetching).await.unwrap();

        // Several periods pass with the first fetch still hanging
        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
        handle.retry();
        tokio::task::yield_now().await;
        assert_eq!(source.calls(), 1);

        gate.notify_one();
        rx.wait_for(|s| s.generation == 1).await.unwrap();
        assert_eq!(source.calls(), 1);

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_during_fetch() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(
            vec![Ok(dataset(&[("node1", 0.5), ("node2", 0.6), ("node3", 0.7)]))],
            gate.clone(),
        ));
        let handle = RefreshScheduler::new(source, PERIOD)
            .unwrap()
            .spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.phase == FetchPhase::Fetching).await.unwrap();
        handle.set_filter("node1");
        handle.set_filter("node3");
        rx.wait_for(|s| s.filter == "node3").await.unwrap();

        gate.notify_one();
        let snapshot = rx.wait_for(|s| s.generation == 1).await.unwrap().clone();

        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].node.as_str(), "node3");

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_dataset_delays_first_poll() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(dataset(&[("node9", 0.9)]))]));
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .with_initial_dataset(dataset(&[("node1", 0.5)]))
            .spawn();
        let mut rx = handle.subscribe();

        assert_eq!(handle.snapshot().rows.len(), 1);
        tokio::time::sleep(PERIOD / 2).await;
        assert_eq!(source.calls(), 0);

        rx.wait_for(|s| s.generation == 2).await.unwrap();
        assert_eq!(handle.snapshot().rows[0].node.as_str(), "node9");

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_triggers_fetch() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(dataset(&[("node2", 0.2)]))]));
        let started = Instant::now();
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .with_initial_dataset(dataset(&[("node1", 0.5)]))
            .spawn();
        let mut rx = handle.subscribe();

        handle.set_online(false);
        rx.wait_for(|s| !s.online).await.unwrap();
        handle.set_online(true);
        rx.wait_for(|s| s.generation == 2).await.unwrap();

        assert!(started.elapsed() < PERIOD);
        assert_eq!(source.calls(), 1);

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_refetch_can_be_disabled() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handle = RefreshScheduler::new(source.clone(), PERIOD)
            .unwrap()
            .with_initial_dataset(dataset(&[("node1", 0.5)]))
            .with_refetch_on_reconnect(false)
            .spawn();
        let mut rx = handle.subscribe();

        handle.set_online(false);
        rx.wait_for(|s| !s.online).await.unwrap();
        handle.set_online(true);
        rx.wait_for(|s| s.online).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(source.calls(), 0);
        handle.shutdown();
    }

    #[test]
    fn test_period_bounds() {
        assert!(validate_period(DEFAULT_REFRESH_PERIOD).is_ok());
        assert!(validate_period(MAX_REFRESH_PERIOD).is_ok());

        let source: Arc<dyn DataSource> = Arc::new(ScriptedSource::new(vec![]));
        let zero = RefreshScheduler::new(source.clone(), Duration::ZERO);
        assert!(matches!(zero, Err(Error::InvalidConfiguration(_))));

        let huge = RefreshScheduler::new(source, Duration::from_millis(u64::MAX));
        assert!(matches!(huge, Err(Error::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(RawDataset::new())]));
        let handle = RefreshScheduler::new(source, PERIOD)
            .unwrap()
            .spawn();

        handle.shutdown();
        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());

        // Commands after shutdown are dropped quietly
        handle.retry();
    }
}
