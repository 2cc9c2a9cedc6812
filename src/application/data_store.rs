// Data store - latest fetched bundle per dataset group
use crate::domain::dataset::{ConnectionStatus, DatasetGroupId, GroupBundle};
use crate::domain::filter::FilterState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds only the latest bundle per group; no history. Written by the
/// fetch orchestrator, read by the presentation layer.
#[derive(Debug, Default)]
pub struct DataStore {
    groups: HashMap<DatasetGroupId, GroupBundle>,
    status: ConnectionStatus,
}

pub type SharedDataStore = Arc<RwLock<DataStore>>;

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundle(&self, group: DatasetGroupId) -> Option<&GroupBundle> {
        self.groups.get(&group)
    }

    /// Whole-group replacement; partial per-table updates are not a
    /// valid state.
    pub fn replace(&mut self, group: DatasetGroupId, bundle: GroupBundle) {
        self.groups.insert(group, bundle);
    }

    /// True when the stored bundle was produced under the current
    /// filter values.
    pub fn is_fresh(&self, group: DatasetGroupId, filters: &FilterState) -> bool {
        self.groups
            .get(&group)
            .map(|b| b.matches(filters))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn last_fetch_times(&self) -> HashMap<&'static str, DateTime<Utc>> {
        self.groups
            .iter()
            .map(|(group, bundle)| (group.slug(), bundle.fetched_at))
            .collect()
    }
}
