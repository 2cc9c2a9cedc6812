// Dataset group domain model
use crate::domain::filter::{FilterState, Generation};
use crate::domain::table::Table;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Named bundle of result tables backing one data-driven dashboard tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetGroupId {
    AppsUsage,
    CostRoi,
    Security,
    WeeklyTrends,
}

impl DatasetGroupId {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::AppsUsage => "apps-usage",
            Self::CostRoi => "cost-roi",
            Self::Security => "security",
            Self::WeeklyTrends => "weekly-trends",
        }
    }

    /// Named member queries, in fetch order.
    pub fn member_queries(&self) -> &'static [&'static str] {
        match self {
            Self::AppsUsage => &[
                "kpi_summary",
                "dau_trend",
                "top_apps",
                "usage_heatmap",
                "user_cohorts",
                "error_monitoring",
                "user_segmentation",
            ],
            Self::CostRoi => &["cost_summary", "cost_metrics"],
            Self::Security => &["security_events", "app_lifecycle_events"],
            Self::WeeklyTrends => &["weekly_trends"],
        }
    }
}

/// Latest fetched tables for one dataset group. Every member table
/// reflects the same `(days_back, workspace_id)` snapshot; the bundle is
/// always replaced wholesale, never patched per table.
#[derive(Debug, Clone)]
pub struct GroupBundle {
    pub tables: HashMap<String, Table>,
    pub fetched_at: DateTime<Utc>,
    pub generation: Generation,
    pub days_back: i64,
    pub workspace_id: String,
    /// Names of member queries that degraded to an empty table.
    pub degraded: Vec<String>,
}

impl GroupBundle {
    pub fn empty(generation: Generation, days_back: i64, workspace_id: String) -> Self {
        Self {
            tables: HashMap::new(),
            fetched_at: Utc::now(),
            generation,
            days_back,
            workspace_id,
            degraded: Vec::new(),
        }
    }

    /// True when the bundle was produced under the current filter values.
    pub fn matches(&self, filters: &FilterState) -> bool {
        self.days_back == filters.date_range.days() && self.workspace_id == filters.workspace_id
    }
}

/// Warehouse reachability as observed by the most recent fetch. The only
/// place store failures are allowed to surface to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Healthy,
    Degraded,
}
