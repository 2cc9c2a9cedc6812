// Filter state domain model
use crate::domain::dataset::DatasetGroupId;
use serde::{Serialize, Serializer};

/// Date-range options offered by the dashboard filter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Days7,
    Days30,
    Days90,
    Days180,
}

impl DateRange {
    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            7 => Some(Self::Days7),
            30 => Some(Self::Days30),
            90 => Some(Self::Days90),
            180 => Some(Self::Days180),
            _ => None,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
            Self::Days180 => 180,
        }
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.days())
    }
}

/// Version tag for the filter state. Fetch results carry the generation
/// they were issued under so stale async results can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(&self) -> Self {
        Generation(self.0 + 1)
    }
}

/// Dashboard tabs. Data-backed tabs map to a dataset group; embedded
/// dashboard tabs do not participate in the fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabId {
    AppsUsage,
    CostRoi,
    Security,
    WeeklyTrends,
    LogfoodAnalytics,
    InfrastructureMetrics,
}

impl TabId {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "apps-usage" => Some(Self::AppsUsage),
            "cost-roi" => Some(Self::CostRoi),
            "security" => Some(Self::Security),
            "weekly-trends" => Some(Self::WeeklyTrends),
            "logfood-analytics" => Some(Self::LogfoodAnalytics),
            "infrastructure-metrics" => Some(Self::InfrastructureMetrics),
            _ => None,
        }
    }

    pub fn dataset_group(&self) -> Option<DatasetGroupId> {
        match self {
            Self::AppsUsage => Some(DatasetGroupId::AppsUsage),
            Self::CostRoi => Some(DatasetGroupId::CostRoi),
            Self::Security => Some(DatasetGroupId::Security),
            Self::WeeklyTrends => Some(DatasetGroupId::WeeklyTrends),
            Self::LogfoodAnalytics | Self::InfrastructureMetrics => None,
        }
    }
}

/// Session-scoped filter values read by the fetch orchestrator on every
/// trigger evaluation. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FilterState {
    pub date_range: DateRange,
    pub auto_refresh_enabled: bool,
    pub active_tab: TabId,
    pub workspace_id: String,
    pub generation: Generation,
}

impl FilterState {
    pub fn new(
        date_range: DateRange,
        auto_refresh_enabled: bool,
        active_tab: TabId,
        workspace_id: String,
    ) -> Self {
        Self {
            date_range,
            auto_refresh_enabled,
            active_tab,
            workspace_id,
            generation: Generation(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_from_days() {
        assert_eq!(DateRange::from_days(30), Some(DateRange::Days30));
        assert_eq!(DateRange::from_days(180), Some(DateRange::Days180));
        assert_eq!(DateRange::from_days(14), None);
        assert_eq!(DateRange::from_days(0), None);
    }

    #[test]
    fn test_tab_slug_round_trip() {
        assert_eq!(TabId::from_slug("apps-usage"), Some(TabId::AppsUsage));
        assert_eq!(TabId::from_slug("weekly-trends"), Some(TabId::WeeklyTrends));
        assert_eq!(TabId::from_slug("unknown"), None);
    }

    #[test]
    fn test_embedded_tabs_have_no_dataset_group() {
        assert!(TabId::LogfoodAnalytics.dataset_group().is_none());
        assert!(TabId::InfrastructureMetrics.dataset_group().is_none());
        assert_eq!(
            TabId::CostRoi.dataset_group(),
            Some(DatasetGroupId::CostRoi)
        );
    }
}
