// Fetch orchestrator - trigger/skip state machine and fetch execution
use crate::application::data_store::{DataStore, SharedDataStore};
use crate::application::query_catalog;
use crate::application::warehouse_repository::{StoreError, WarehouseRepository};
use crate::domain::dataset::{ConnectionStatus, DatasetGroupId, GroupBundle};
use crate::domain::filter::{DateRange, FilterState, Generation, TabId};
use crate::domain::table::Table;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// External signals driving the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    TimerTick,
    ManualRefresh,
    DateRangeChanged(DateRange),
    TabSwitched(TabId),
    AutoRefreshToggled(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Skip,
    Fetch(DatasetGroupId),
}

/// Pure trigger decision, evaluated against the filter state *after*
/// the signal has been applied to it. Rules in order:
/// 1. Timer ticks are hard-skipped while auto refresh is off.
/// 2. Tab switches skip when the target group is already fresh under
///    the current filter values.
/// 3. Manual refresh and date-range changes always fetch.
/// Tabs without a dataset group (embedded dashboards) never fetch.
pub fn decide(signal: &Signal, filters: &FilterState, store: &DataStore) -> Action {
    if matches!(signal, Signal::TimerTick) && !filters.auto_refresh_enabled {
        return Action::Skip;
    }
    let Some(group) = filters.active_tab.dataset_group() else {
        return Action::Skip;
    };
    match signal {
        Signal::TabSwitched(_) => {
            if store.is_fresh(group, filters) {
                Action::Skip
            } else {
                Action::Fetch(group)
            }
        }
        Signal::AutoRefreshToggled(_) => Action::Skip,
        Signal::TimerTick | Signal::ManualRefresh | Signal::DateRangeChanged(_) => {
            Action::Fetch(group)
        }
    }
}

/// Completed group fetch, tagged with the generation it was issued
/// under.
#[derive(Debug)]
pub struct FetchOutcome {
    pub group: DatasetGroupId,
    pub bundle: GroupBundle,
}

pub struct FetchOrchestrator {
    repository: Arc<dyn WarehouseRepository>,
    store: SharedDataStore,
    filters: FilterState,
    in_flight: HashMap<DatasetGroupId, Generation>,
    outcome_tx: mpsc::Sender<FetchOutcome>,
    filters_tx: watch::Sender<FilterState>,
}

impl FetchOrchestrator {
    pub fn new(
        repository: Arc<dyn WarehouseRepository>,
        store: SharedDataStore,
        filters: FilterState,
        outcome_tx: mpsc::Sender<FetchOutcome>,
        filters_tx: watch::Sender<FilterState>,
    ) -> Self {
        Self {
            repository,
            store,
            filters,
            in_flight: HashMap::new(),
            outcome_tx,
            filters_tx,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub async fn handle_signal(&mut self, signal: Signal) {
        self.apply_signal(&signal);
        let action = {
            let store = self.store.read().await;
            decide(&signal, &self.filters, &store)
        };
        match action {
            Action::Skip => {
                tracing::debug!(?signal, "skipping fetch");
            }
            Action::Fetch(group) => self.spawn_fetch(group),
        }
    }

    /// Mutate the filter state before the trigger decision. A date-range
    /// change invalidates everything fetched so far, so it bumps the
    /// generation.
    fn apply_signal(&mut self, signal: &Signal) {
        let changed = match signal {
            Signal::DateRangeChanged(range) if *range != self.filters.date_range => {
                self.filters.date_range = *range;
                self.filters.generation = self.filters.generation.next();
                true
            }
            Signal::TabSwitched(tab) if *tab != self.filters.active_tab => {
                self.filters.active_tab = *tab;
                true
            }
            Signal::AutoRefreshToggled(enabled) => {
                self.filters.auto_refresh_enabled = *enabled;
                true
            }
            _ => false,
        };
        if changed {
            let _ = self.filters_tx.send(self.filters.clone());
        }
    }

    /// One in-flight fetch per group per generation; a newer generation
    /// supersedes an older in-flight fetch, whose result will be
    /// discarded on arrival.
    fn spawn_fetch(&mut self, group: DatasetGroupId) {
        let generation = self.filters.generation;
        if self.in_flight.get(&group) == Some(&generation) {
            tracing::debug!(group = group.slug(), "fetch already in flight");
            return;
        }
        self.in_flight.insert(group, generation);

        let repository = self.repository.clone();
        let days_back = self.filters.date_range.days();
        let workspace_id = self.filters.workspace_id.clone();
        let outcome_tx = self.outcome_tx.clone();

        tracing::debug!(
            group = group.slug(),
            days_back,
            generation = generation.0,
            "fetching dataset group"
        );
        tokio::spawn(async move {
            let bundle =
                fetch_group(repository.as_ref(), group, days_back, &workspace_id, generation)
                    .await;
            let _ = outcome_tx.send(FetchOutcome { group, bundle }).await;
        });
    }

    /// Apply a completed fetch. Results issued under a superseded
    /// generation are discarded so the store never regresses to
    /// older-generation data.
    pub async fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if self.in_flight.get(&outcome.group) == Some(&outcome.bundle.generation) {
            self.in_flight.remove(&outcome.group);
        }
        if outcome.bundle.generation != self.filters.generation {
            tracing::debug!(
                group = outcome.group.slug(),
                stale = outcome.bundle.generation.0,
                current = self.filters.generation.0,
                "discarding stale fetch result"
            );
            return;
        }
        let mut store = self.store.write().await;
        let status = if outcome.bundle.degraded.is_empty() {
            ConnectionStatus::Healthy
        } else {
            ConnectionStatus::Degraded
        };
        store.set_status(status);
        store.replace(outcome.group, outcome.bundle);
    }

    /// Event loop: timer ticks, UI signals, and fetch completions. The
    /// interval's immediate first tick is consumed and replaced by an
    /// unconditional initial load.
    pub async fn run(
        mut self,
        mut signal_rx: mpsc::Receiver<Signal>,
        mut outcome_rx: mpsc::Receiver<FetchOutcome>,
        interval_ms: u64,
    ) {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        self.handle_signal(Signal::ManualRefresh).await;

        loop {
            tokio::select! {
                Some(signal) = signal_rx.recv() => self.handle_signal(signal).await,
                Some(outcome) = outcome_rx.recv() => self.apply_outcome(outcome).await,
                _ = ticker.tick() => self.handle_signal(Signal::TimerTick).await,
            }
        }
    }
}

/// Issue every member query of the group in parallel. A failed query
/// degrades to an empty table for that name only and never aborts its
/// siblings; a bundle with every table degraded is still a valid
/// outcome.
async fn fetch_group(
    repository: &dyn WarehouseRepository,
    group: DatasetGroupId,
    days_back: i64,
    workspace_id: &str,
    generation: Generation,
) -> GroupBundle {
    let queries = query_catalog::group_queries(group, days_back, workspace_id);
    let results = join_all(queries.iter().map(|query| async move {
        match repository.execute(query).await {
            Ok(table) => (query.name.clone(), table, false),
            Err(error) => {
                log_degraded(&query.name, &error);
                (query.name.clone(), Table::empty(), true)
            }
        }
    }))
    .await;

    let mut bundle = GroupBundle {
        tables: HashMap::with_capacity(results.len()),
        fetched_at: Utc::now(),
        generation,
        days_back,
        workspace_id: workspace_id.to_string(),
        degraded: Vec::new(),
    };
    for (name, table, degraded) in results {
        if degraded {
            bundle.degraded.push(name.clone());
        }
        bundle.tables.insert(name, table);
    }
    bundle
}

fn log_degraded(name: &str, error: &StoreError) {
    match error {
        StoreError::Connection(_) => {
            tracing::warn!(query = name, %error, "warehouse unreachable, degrading to empty table");
        }
        StoreError::Query(_) => {
            tracing::warn!(query = name, %error, "query failed, degrading to empty table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query_catalog::QueryDefinition;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;
    use tokio::time::timeout;

    struct MockRepository {
        calls: AtomicUsize,
        fail: HashSet<&'static str>,
    }

    impl MockRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: HashSet::new(),
            })
        }

        fn failing(names: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: names.iter().copied().collect(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WarehouseRepository for MockRepository {
        async fn execute(&self, query: &QueryDefinition) -> Result<Table, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(query.name.as_str()) {
                return Err(StoreError::Query("rejected".to_string()));
            }
            Ok(Table::new(
                vec!["activity_date".to_string(), "total_clicks".to_string()],
                vec![vec![json!("2026-08-01"), json!(1)]],
            ))
        }
    }

    struct Harness {
        repository: Arc<MockRepository>,
        store: SharedDataStore,
        orchestrator: FetchOrchestrator,
        outcome_rx: mpsc::Receiver<FetchOutcome>,
    }

    fn harness_with(repository: Arc<MockRepository>, auto_refresh: bool) -> Harness {
        let store: SharedDataStore = Arc::new(RwLock::new(DataStore::new()));
        let filters = FilterState::new(
            DateRange::Days30,
            auto_refresh,
            TabId::AppsUsage,
            "ws-1".to_string(),
        );
        let (outcome_tx, outcome_rx) = mpsc::channel(16);
        let (filters_tx, _filters_rx) = watch::channel(filters.clone());
        let orchestrator = FetchOrchestrator::new(
            repository.clone(),
            store.clone(),
            filters,
            outcome_tx,
            filters_tx,
        );
        Harness {
            repository,
            store,
            orchestrator,
            outcome_rx,
        }
    }

    fn harness(auto_refresh: bool) -> Harness {
        harness_with(MockRepository::new(), auto_refresh)
    }

    #[tokio::test]
    async fn test_timer_tick_skips_when_auto_refresh_disabled() {
        let mut h = harness(false);
        h.orchestrator.handle_signal(Signal::TimerTick).await;

        let arrived = timeout(Duration::from_millis(50), h.outcome_rx.recv()).await;
        assert!(arrived.is_err());
        assert_eq!(h.repository.call_count(), 0);
        assert!(h.store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_timer_tick_fetches_when_auto_refresh_enabled() {
        let mut h = harness(true);
        h.orchestrator.handle_signal(Signal::TimerTick).await;

        let outcome = h.outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.group, DatasetGroupId::AppsUsage);
        assert_eq!(
            h.repository.call_count(),
            DatasetGroupId::AppsUsage.member_queries().len()
        );
    }

    #[tokio::test]
    async fn test_manual_refresh_forces_fetch_even_when_fresh_and_auto_off() {
        let mut h = harness(false);
        {
            let mut store = h.store.write().await;
            store.replace(
                DatasetGroupId::AppsUsage,
                GroupBundle::empty(Generation(0), 30, "ws-1".to_string()),
            );
        }
        h.orchestrator.handle_signal(Signal::ManualRefresh).await;

        let outcome = h.outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.group, DatasetGroupId::AppsUsage);
        assert!(h.repository.call_count() > 0);
    }

    #[tokio::test]
    async fn test_tab_switch_skips_when_group_is_fresh() {
        let mut h = harness(true);
        {
            let mut store = h.store.write().await;
            store.replace(
                DatasetGroupId::CostRoi,
                GroupBundle::empty(Generation(0), 30, "ws-1".to_string()),
            );
        }
        h.orchestrator
            .handle_signal(Signal::TabSwitched(TabId::CostRoi))
            .await;

        let arrived = timeout(Duration::from_millis(50), h.outcome_rx.recv()).await;
        assert!(arrived.is_err());
        assert_eq!(h.repository.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tab_switch_fetches_when_stale_or_missing() {
        let mut h = harness(true);
        {
            // Fetched under 90 days, current filter is 30: stale.
            let mut store = h.store.write().await;
            store.replace(
                DatasetGroupId::CostRoi,
                GroupBundle::empty(Generation(0), 90, "ws-1".to_string()),
            );
        }
        h.orchestrator
            .handle_signal(Signal::TabSwitched(TabId::CostRoi))
            .await;
        assert_eq!(h.outcome_rx.recv().await.unwrap().group, DatasetGroupId::CostRoi);

        h.orchestrator
            .handle_signal(Signal::TabSwitched(TabId::WeeklyTrends))
            .await;
        assert_eq!(
            h.outcome_rx.recv().await.unwrap().group,
            DatasetGroupId::WeeklyTrends
        );
    }

    #[tokio::test]
    async fn test_embedded_tab_never_fetches() {
        let mut h = harness(true);
        h.orchestrator
            .handle_signal(Signal::TabSwitched(TabId::LogfoodAnalytics))
            .await;
        h.orchestrator.handle_signal(Signal::ManualRefresh).await;

        let arrived = timeout(Duration::from_millis(50), h.outcome_rx.recv()).await;
        assert!(arrived.is_err());
        assert_eq!(h.repository.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_generation_result_is_discarded() {
        let mut h = harness(true);

        // Fetch issued under generation 0, superseded before arrival.
        let stale = FetchOutcome {
            group: DatasetGroupId::AppsUsage,
            bundle: GroupBundle::empty(Generation(0), 30, "ws-1".to_string()),
        };
        h.orchestrator
            .handle_signal(Signal::DateRangeChanged(DateRange::Days90))
            .await;
        let current_generation = h.orchestrator.filters().generation;
        assert_eq!(current_generation, Generation(1));

        h.orchestrator.apply_outcome(stale).await;
        assert!(h.store.read().await.bundle(DatasetGroupId::AppsUsage).is_none());

        let fresh = FetchOutcome {
            group: DatasetGroupId::AppsUsage,
            bundle: GroupBundle::empty(current_generation, 90, "ws-1".to_string()),
        };
        h.orchestrator.apply_outcome(fresh).await;

        let store = h.store.read().await;
        let bundle = store.bundle(DatasetGroupId::AppsUsage).unwrap();
        assert_eq!(bundle.generation, current_generation);
        assert_eq!(bundle.days_back, 90);
    }

    #[tokio::test]
    async fn test_store_never_regresses_to_older_generation() {
        let mut h = harness(true);
        h.orchestrator
            .handle_signal(Signal::AutoRefreshToggled(true))
            .await;
        h.orchestrator
            .handle_signal(Signal::DateRangeChanged(DateRange::Days7))
            .await;
        let current_generation = h.orchestrator.filters().generation;

        // Drain the fetch spawned by the date-range change.
        let outcome = h.outcome_rx.recv().await.unwrap();
        h.orchestrator.apply_outcome(outcome).await;

        // A late result from the superseded generation arrives afterwards.
        let late = FetchOutcome {
            group: DatasetGroupId::AppsUsage,
            bundle: GroupBundle::empty(Generation(0), 30, "ws-1".to_string()),
        };
        h.orchestrator.apply_outcome(late).await;

        let store = h.store.read().await;
        let bundle = store.bundle(DatasetGroupId::AppsUsage).unwrap();
        assert_eq!(bundle.generation, current_generation);
        assert_eq!(bundle.days_back, 7);
    }

    #[tokio::test]
    async fn test_duplicate_fetch_for_same_generation_is_skipped() {
        let mut h = harness(true);
        h.orchestrator.handle_signal(Signal::ManualRefresh).await;
        h.orchestrator.handle_signal(Signal::ManualRefresh).await;

        // Exactly one group fetch should have been spawned.
        let first = h.outcome_rx.recv().await;
        assert!(first.is_some());
        let second = timeout(Duration::from_millis(50), h.outcome_rx.recv()).await;
        assert!(second.is_err());
        assert_eq!(
            h.repository.call_count(),
            DatasetGroupId::AppsUsage.member_queries().len()
        );
    }

    #[tokio::test]
    async fn test_failed_query_degrades_only_its_table() {
        let mut h = harness_with(MockRepository::failing(&["top_apps"]), true);
        h.orchestrator.handle_signal(Signal::ManualRefresh).await;

        let outcome = h.outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.bundle.degraded, vec!["top_apps".to_string()]);
        assert!(outcome.bundle.tables["top_apps"].is_empty());
        assert!(!outcome.bundle.tables["dau_trend"].is_empty());

        h.orchestrator.apply_outcome(outcome).await;
        let store = h.store.read().await;
        assert_eq!(store.status(), ConnectionStatus::Degraded);
        assert!(store.bundle(DatasetGroupId::AppsUsage).is_some());
    }

    #[tokio::test]
    async fn test_fully_degraded_bundle_is_still_a_valid_outcome() {
        let failing: Vec<&'static str> = DatasetGroupId::WeeklyTrends
            .member_queries()
            .to_vec();
        let mut h = harness_with(MockRepository::failing(&failing), true);
        h.orchestrator
            .handle_signal(Signal::TabSwitched(TabId::WeeklyTrends))
            .await;

        let outcome = h.outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.bundle.degraded.len(), 1);
        h.orchestrator.apply_outcome(outcome).await;
        assert!(h
            .store
            .read()
            .await
            .bundle(DatasetGroupId::WeeklyTrends)
            .is_some());
    }
}
