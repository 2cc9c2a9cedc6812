// Chart-ready series models exposed at the render boundary
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Canonical week ordering for the usage heatmap.
pub const DAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_users: i64,
    pub total_apps: i64,
    pub total_interactions: i64,
    pub avg_interactions_per_user: f64,
    pub error_rate_pct: f64,
    pub user_growth_pct: Option<f64>,
    pub interaction_growth_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub active_users: i64,
    pub total_clicks: i64,
    pub apps_accessed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedApp {
    pub app_name: String,
    pub click_count: i64,
    pub unique_users: i64,
    pub pct_of_total: f64,
    pub active_days: i64,
}

/// Fixed 7x24 day-of-week by hour-of-day matrix. Cells without source
/// rows hold zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    pub cells: [[i64; HOURS_PER_DAY]; 7],
}

impl HeatmapMatrix {
    pub fn zeroed() -> Self {
        Self {
            cells: [[0; HOURS_PER_DAY]; 7],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortPoint {
    pub date: NaiveDate,
    pub new_users: i64,
    pub returning_users: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMonitorPoint {
    pub date: NaiveDate,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub error_rate_pct: f64,
}

/// Engagement bands, evaluated highest first with inclusive lower bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Power,
    Active,
    Regular,
    Casual,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Power => "Power User",
            Self::Active => "Active User",
            Self::Regular => "Regular User",
            Self::Casual => "Casual User",
        }
    }
}

/// Segments render as their display labels, e.g. "Power User".
impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRow {
    pub user_email: String,
    pub segment: Segment,
    pub total_clicks: i64,
    pub apps_accessed: i64,
    pub days_active: i64,
    pub avg_clicks_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_dbus: f64,
    pub total_cost_usd: f64,
    pub apps_with_cost: i64,
    pub avg_daily_dbus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostTrendPoint {
    pub date: NaiveDate,
    pub total_dbus: f64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppCost {
    pub app_name: String,
    pub total_dbus: f64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdownRow {
    pub date: NaiveDate,
    pub app_name: String,
    pub sku_name: String,
    pub total_dbus: f64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityTimelinePoint {
    pub date: NaiveDate,
    pub action_name: String,
    pub event_count: i64,
    pub unique_users: i64,
    pub failed_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    pub date: NaiveDate,
    pub action_name: String,
    pub app_name: String,
    pub performed_by: String,
    pub status_code: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrendPoint {
    pub week_start: NaiveDate,
    pub weekly_users: i64,
    pub weekly_interactions: i64,
    pub weekly_active_apps: i64,
    pub weekly_error_rate: f64,
}

/// All chart series for one tab, recomputed wholesale on every bundle
/// update. The render layer never sees raw rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tab", rename_all = "kebab-case")]
pub enum TabSeries {
    AppsUsage {
        kpi: Option<KpiSummary>,
        dau_trend: Vec<TrendPoint>,
        top_apps: Vec<RankedApp>,
        usage_heatmap: HeatmapMatrix,
        user_cohorts: Vec<CohortPoint>,
        error_monitoring: Vec<ErrorMonitorPoint>,
        user_segmentation: Vec<SegmentRow>,
    },
    CostRoi {
        summary: Option<CostSummary>,
        dbu_trend: Vec<CostTrendPoint>,
        cost_by_app: Vec<AppCost>,
        breakdown: Vec<CostBreakdownRow>,
    },
    Security {
        timeline: Vec<SecurityTimelinePoint>,
        lifecycle: Vec<LifecycleEvent>,
    },
    WeeklyTrends {
        weekly: Vec<WeeklyTrendPoint>,
    },
}
