// Transform layer - pure conversion of fetched tables into chart series
use crate::domain::dataset::{DatasetGroupId, GroupBundle};
use crate::domain::series::{
    AppCost, CohortPoint, CostBreakdownRow, CostSummary, CostTrendPoint, DAY_ORDER,
    ErrorMonitorPoint, HeatmapMatrix, HOURS_PER_DAY, KpiSummary, LifecycleEvent, RankedApp,
    Segment, SegmentRow, SecurityTimelinePoint, TabSeries, TrendPoint, WeeklyTrendPoint,
};
use crate::domain::table::Table;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Inclusive lower bounds for the engagement bands, checked highest
/// first.
pub const POWER_USER_MIN_CLICKS: i64 = 100;
pub const ACTIVE_USER_MIN_CLICKS: i64 = 50;
pub const REGULAR_USER_MIN_CLICKS: i64 = 10;

/// Display cap for the segmentation table. KPI numbers come from the
/// full result set and are unaffected by this cap.
pub const MAX_SEGMENT_ROWS: usize = 20;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Period-over-period growth, rounded to one decimal. Undefined when
/// the prior period count is zero.
pub fn growth_pct(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some(round1((current - previous) / previous * 100.0))
    }
}

pub fn kpi_summary(table: &Table) -> Option<KpiSummary> {
    if table.is_empty() {
        return None;
    }
    let total_users = table.i64_at(0, "total_unique_users").unwrap_or(0);
    let total_interactions = table.i64_at(0, "total_interactions").unwrap_or(0);
    let prev_users = table.i64_at(0, "prev_users").unwrap_or(0);
    let prev_interactions = table.i64_at(0, "prev_interactions").unwrap_or(0);

    Some(KpiSummary {
        total_users,
        total_apps: table.i64_at(0, "total_unique_apps").unwrap_or(0),
        total_interactions,
        avg_interactions_per_user: table.f64_at(0, "avg_interactions_per_user").unwrap_or(0.0),
        error_rate_pct: table.f64_at(0, "overall_error_rate").unwrap_or(0.0),
        user_growth_pct: growth_pct(total_users as f64, prev_users as f64),
        interaction_growth_pct: growth_pct(total_interactions as f64, prev_interactions as f64),
    })
}

/// Walk the calendar from the first to the last observed day, emitting
/// a zero value for every day the source omitted.
fn zero_filled<T>(observed: Vec<(NaiveDate, T)>, zero: impl Fn(NaiveDate) -> T) -> Vec<T> {
    let mut by_date: BTreeMap<NaiveDate, T> = observed.into_iter().collect();
    let (Some(first), Some(last)) = (
        by_date.keys().next().copied(),
        by_date.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut day = first;
    while day <= last {
        out.push(by_date.remove(&day).unwrap_or_else(|| zero(day)));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

pub fn dau_trend(table: &Table) -> Vec<TrendPoint> {
    let observed: Vec<(NaiveDate, TrendPoint)> = (0..table.len())
        .filter_map(|row| {
            let date = table.date_at(row, "activity_date")?;
            Some((
                date,
                TrendPoint {
                    date,
                    active_users: table.i64_at(row, "daily_active_users").unwrap_or(0),
                    total_clicks: table.i64_at(row, "total_clicks").unwrap_or(0),
                    apps_accessed: table.i64_at(row, "apps_accessed").unwrap_or(0),
                },
            ))
        })
        .collect();

    zero_filled(observed, |date| TrendPoint {
        date,
        active_users: 0,
        total_clicks: 0,
        apps_accessed: 0,
    })
}

/// Ranked apps sorted ascending by click count (horizontal bar
/// convention). Percentage of total is computed against the sum of this
/// result set, not a separate grand-total query.
pub fn top_apps(table: &Table) -> Vec<RankedApp> {
    let mut apps: Vec<RankedApp> = (0..table.len())
        .filter_map(|row| {
            Some(RankedApp {
                app_name: table.str_at(row, "app_name")?.to_string(),
                click_count: table.i64_at(row, "click_count").unwrap_or(0),
                unique_users: table.i64_at(row, "unique_users").unwrap_or(0),
                pct_of_total: 0.0,
                active_days: table.i64_at(row, "active_days").unwrap_or(0),
            })
        })
        .collect();

    let total: i64 = apps.iter().map(|a| a.click_count).sum();
    if total > 0 {
        for app in &mut apps {
            app.pct_of_total = round2(app.click_count as f64 * 100.0 / total as f64);
        }
    }
    apps.sort_by_key(|a| a.click_count);
    apps
}

/// Pivot sparse `(day_name, hour_of_day)` rows into the fixed 7x24
/// matrix. Rows with unknown day names or out-of-range hours are
/// dropped; absent cells stay zero.
pub fn usage_heatmap(table: &Table) -> HeatmapMatrix {
    let mut matrix = HeatmapMatrix::zeroed();
    for row in 0..table.len() {
        let Some(day_name) = table.str_at(row, "day_name") else {
            continue;
        };
        let Some(day_idx) = DAY_ORDER.iter().position(|d| *d == day_name) else {
            continue;
        };
        let Some(hour) = table.i64_at(row, "hour_of_day") else {
            continue;
        };
        if !(0..HOURS_PER_DAY as i64).contains(&hour) {
            continue;
        }
        matrix.cells[day_idx][hour as usize] = table.i64_at(row, "click_count").unwrap_or(0);
    }
    matrix
}

pub fn user_cohorts(table: &Table) -> Vec<CohortPoint> {
    let observed: Vec<(NaiveDate, CohortPoint)> = (0..table.len())
        .filter_map(|row| {
            let date = table.date_at(row, "activity_date")?;
            Some((
                date,
                CohortPoint {
                    date,
                    new_users: table.i64_at(row, "new_users").unwrap_or(0),
                    returning_users: table.i64_at(row, "returning_users").unwrap_or(0),
                },
            ))
        })
        .collect();

    zero_filled(observed, |date| CohortPoint {
        date,
        new_users: 0,
        returning_users: 0,
    })
}

pub fn error_monitoring(table: &Table) -> Vec<ErrorMonitorPoint> {
    let observed: Vec<(NaiveDate, ErrorMonitorPoint)> = (0..table.len())
        .filter_map(|row| {
            let date = table.date_at(row, "activity_date")?;
            Some((
                date,
                ErrorMonitorPoint {
                    date,
                    total_requests: table.i64_at(row, "total_requests").unwrap_or(0),
                    successful_requests: table.i64_at(row, "successful_requests").unwrap_or(0),
                    failed_requests: table.i64_at(row, "failed_requests").unwrap_or(0),
                    error_rate_pct: table.f64_at(row, "error_rate_percentage").unwrap_or(0.0),
                },
            ))
        })
        .collect();

    zero_filled(observed, |date| ErrorMonitorPoint {
        date,
        total_requests: 0,
        successful_requests: 0,
        failed_requests: 0,
        error_rate_pct: 0.0,
    })
}

/// Highest band wins first match; lower bounds are inclusive.
pub fn classify_segment(total_clicks: i64) -> Segment {
    if total_clicks >= POWER_USER_MIN_CLICKS {
        Segment::Power
    } else if total_clicks >= ACTIVE_USER_MIN_CLICKS {
        Segment::Active
    } else if total_clicks >= REGULAR_USER_MIN_CLICKS {
        Segment::Regular
    } else {
        Segment::Casual
    }
}

pub fn user_segmentation(table: &Table) -> Vec<SegmentRow> {
    let mut rows: Vec<SegmentRow> = (0..table.len())
        .filter_map(|row| {
            let total_clicks = table.i64_at(row, "total_clicks").unwrap_or(0);
            Some(SegmentRow {
                user_email: table.str_at(row, "user_email")?.to_string(),
                segment: classify_segment(total_clicks),
                total_clicks,
                apps_accessed: table.i64_at(row, "apps_accessed").unwrap_or(0),
                days_active: table.i64_at(row, "days_active").unwrap_or(0),
                avg_clicks_per_day: table.f64_at(row, "avg_clicks_per_day").unwrap_or(0.0),
            })
        })
        .collect();

    rows.sort_by_key(|r| std::cmp::Reverse(r.total_clicks));
    rows.truncate(MAX_SEGMENT_ROWS);
    rows
}

pub fn cost_summary(table: &Table) -> Option<CostSummary> {
    if table.is_empty() {
        return None;
    }
    Some(CostSummary {
        total_dbus: table.f64_at(0, "total_dbus").unwrap_or(0.0),
        total_cost_usd: table.f64_at(0, "total_cost_usd").unwrap_or(0.0),
        apps_with_cost: table.i64_at(0, "apps_with_cost").unwrap_or(0),
        avg_daily_dbus: table.f64_at(0, "avg_daily_dbus").unwrap_or(0.0),
    })
}

/// Daily DBU totals summed across apps and SKUs, zero-filled by day.
pub fn cost_trend(table: &Table) -> Vec<CostTrendPoint> {
    let mut by_date: BTreeMap<NaiveDate, CostTrendPoint> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(date) = table.date_at(row, "usage_date") else {
            continue;
        };
        let entry = by_date.entry(date).or_insert(CostTrendPoint {
            date,
            total_dbus: 0.0,
            estimated_cost_usd: 0.0,
        });
        entry.total_dbus += table.f64_at(row, "total_dbus").unwrap_or(0.0);
        entry.estimated_cost_usd += table.f64_at(row, "estimated_cost_usd").unwrap_or(0.0);
    }

    zero_filled(by_date.into_iter().collect(), |date| CostTrendPoint {
        date,
        total_dbus: 0.0,
        estimated_cost_usd: 0.0,
    })
}

/// Per-app totals ranked descending by DBU consumption.
pub fn cost_by_app(table: &Table) -> Vec<AppCost> {
    let mut by_app: BTreeMap<String, AppCost> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(app_name) = table.str_at(row, "app_name") else {
            continue;
        };
        let entry = by_app.entry(app_name.to_string()).or_insert(AppCost {
            app_name: app_name.to_string(),
            total_dbus: 0.0,
            estimated_cost_usd: 0.0,
        });
        entry.total_dbus += table.f64_at(row, "total_dbus").unwrap_or(0.0);
        entry.estimated_cost_usd += table.f64_at(row, "estimated_cost_usd").unwrap_or(0.0);
    }

    let mut apps: Vec<AppCost> = by_app.into_values().collect();
    apps.sort_by(|a, b| b.total_dbus.total_cmp(&a.total_dbus));
    apps
}

pub fn cost_breakdown(table: &Table) -> Vec<CostBreakdownRow> {
    (0..table.len())
        .filter_map(|row| {
            Some(CostBreakdownRow {
                date: table.date_at(row, "usage_date")?,
                app_name: table.str_at(row, "app_name").unwrap_or("Unknown").to_string(),
                sku_name: table.str_at(row, "sku_name").unwrap_or("").to_string(),
                total_dbus: table.f64_at(row, "total_dbus").unwrap_or(0.0),
                estimated_cost_usd: table.f64_at(row, "estimated_cost_usd").unwrap_or(0.0),
            })
        })
        .collect()
}

pub fn security_timeline(table: &Table) -> Vec<SecurityTimelinePoint> {
    let mut points: Vec<SecurityTimelinePoint> = (0..table.len())
        .filter_map(|row| {
            Some(SecurityTimelinePoint {
                date: table.date_at(row, "event_date")?,
                action_name: table.str_at(row, "action_name")?.to_string(),
                event_count: table.i64_at(row, "event_count").unwrap_or(0),
                unique_users: table.i64_at(row, "unique_users").unwrap_or(0),
                failed_count: table.i64_at(row, "failed_count").unwrap_or(0),
            })
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date).then(b.event_count.cmp(&a.event_count)));
    points
}

pub fn lifecycle_events(table: &Table) -> Vec<LifecycleEvent> {
    (0..table.len())
        .filter_map(|row| {
            Some(LifecycleEvent {
                date: table.date_at(row, "event_date")?,
                action_name: table.str_at(row, "action_name")?.to_string(),
                app_name: table.str_at(row, "app_name").unwrap_or("Unknown").to_string(),
                performed_by: table.str_at(row, "performed_by").unwrap_or("").to_string(),
                status_code: table.i64_at(row, "status_code").unwrap_or(0),
            })
        })
        .collect()
}

pub fn weekly_trends(table: &Table) -> Vec<WeeklyTrendPoint> {
    let mut points: Vec<WeeklyTrendPoint> = (0..table.len())
        .filter_map(|row| {
            Some(WeeklyTrendPoint {
                week_start: table.date_at(row, "week_start")?,
                weekly_users: table.i64_at(row, "weekly_users").unwrap_or(0),
                weekly_interactions: table.i64_at(row, "weekly_interactions").unwrap_or(0),
                weekly_active_apps: table.i64_at(row, "weekly_active_apps").unwrap_or(0),
                weekly_error_rate: table.f64_at(row, "weekly_error_rate").unwrap_or(0.0),
            })
        })
        .collect();

    points.sort_by_key(|p| p.week_start);
    points
}

/// Assemble the full series object for one tab. Missing or degraded
/// tables produce well-defined empty series.
pub fn tab_series(group: DatasetGroupId, bundle: &GroupBundle) -> TabSeries {
    let empty = Table::empty();
    let table = |name: &str| bundle.tables.get(name).unwrap_or(&empty);

    match group {
        DatasetGroupId::AppsUsage => TabSeries::AppsUsage {
            kpi: kpi_summary(table("kpi_summary")),
            dau_trend: dau_trend(table("dau_trend")),
            top_apps: top_apps(table("top_apps")),
            usage_heatmap: usage_heatmap(table("usage_heatmap")),
            user_cohorts: user_cohorts(table("user_cohorts")),
            error_monitoring: error_monitoring(table("error_monitoring")),
            user_segmentation: user_segmentation(table("user_segmentation")),
        },
        DatasetGroupId::CostRoi => TabSeries::CostRoi {
            summary: cost_summary(table("cost_summary")),
            dbu_trend: cost_trend(table("cost_metrics")),
            cost_by_app: cost_by_app(table("cost_metrics")),
            breakdown: cost_breakdown(table("cost_metrics")),
        },
        DatasetGroupId::Security => TabSeries::Security {
            timeline: security_timeline(table("security_events")),
            lifecycle: lifecycle_events(table("app_lifecycle_events")),
        },
        DatasetGroupId::WeeklyTrends => TabSeries::WeeklyTrends {
            weekly: weekly_trends(table("weekly_trends")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::Generation;
    use serde_json::json;

    #[test]
    fn test_growth_pct_undefined_for_zero_prior() {
        assert_eq!(growth_pct(120.0, 0.0), None);
        assert_eq!(growth_pct(0.0, 0.0), None);
        assert_eq!(growth_pct(150.0, 100.0), Some(50.0));
        assert_eq!(growth_pct(100.0, 150.0), Some(-33.3));
    }

    #[test]
    fn test_kpi_growth_from_raw_counts() {
        let table = Table::new(
            vec![
                "total_unique_users".into(),
                "total_unique_apps".into(),
                "total_interactions".into(),
                "avg_interactions_per_user".into(),
                "overall_error_rate".into(),
                "prev_users".into(),
                "prev_interactions".into(),
            ],
            vec![vec![
                json!(120),
                json!(8),
                json!(3000),
                json!(25.0),
                json!(1.2),
                json!(100),
                json!(0),
            ]],
        );
        let kpi = kpi_summary(&table).unwrap();
        assert_eq!(kpi.user_growth_pct, Some(20.0));
        assert_eq!(kpi.interaction_growth_pct, None);
        assert!(kpi_summary(&Table::empty()).is_none());
    }

    #[test]
    fn test_heatmap_single_cell() {
        let table = Table::new(
            vec!["day_name".into(), "hour_of_day".into(), "click_count".into()],
            vec![vec![json!("Monday"), json!(9), json!(5)]],
        );
        let matrix = usage_heatmap(&table);
        let mut nonzero = 0;
        for day in 0..7 {
            for hour in 0..HOURS_PER_DAY {
                if matrix.cells[day][hour] != 0 {
                    nonzero += 1;
                    assert_eq!((day, hour), (0, 9));
                    assert_eq!(matrix.cells[day][hour], 5);
                }
            }
        }
        assert_eq!(nonzero, 1);
    }

    #[test]
    fn test_heatmap_drops_invalid_cells() {
        let table = Table::new(
            vec!["day_name".into(), "hour_of_day".into(), "click_count".into()],
            vec![
                vec![json!("Funday"), json!(9), json!(5)],
                vec![json!("Tuesday"), json!(24), json!(5)],
            ],
        );
        assert_eq!(usage_heatmap(&table), HeatmapMatrix::zeroed());
    }

    #[test]
    fn test_segmentation_band_boundaries() {
        assert_eq!(classify_segment(100), Segment::Power);
        assert_eq!(classify_segment(99), Segment::Active);
        assert_eq!(classify_segment(50), Segment::Active);
        assert_eq!(classify_segment(49), Segment::Regular);
        assert_eq!(classify_segment(10), Segment::Regular);
        assert_eq!(classify_segment(9), Segment::Casual);
        assert_eq!(classify_segment(0), Segment::Casual);
    }

    fn segmentation_table(n: usize) -> Table {
        let rows = (0..n)
            .map(|i| {
                vec![
                    json!(format!("user{i}@example.com")),
                    json!(200 - i as i64),
                    json!(3),
                    json!(5),
                    json!(4.0),
                ]
            })
            .collect();
        Table::new(
            vec![
                "user_email".into(),
                "total_clicks".into(),
                "apps_accessed".into(),
                "days_active".into(),
                "avg_clicks_per_day".into(),
            ],
            rows,
        )
    }

    #[test]
    fn test_segmentation_truncates_after_sorting() {
        let rows = user_segmentation(&segmentation_table(30));
        assert_eq!(rows.len(), MAX_SEGMENT_ROWS);
        assert_eq!(rows[0].total_clicks, 200);
        assert!(rows.windows(2).all(|w| w[0].total_clicks >= w[1].total_clicks));
    }

    #[test]
    fn test_dau_trend_zero_fills_gap_days() {
        let table = Table::new(
            vec![
                "activity_date".into(),
                "daily_active_users".into(),
                "total_clicks".into(),
                "apps_accessed".into(),
            ],
            vec![
                vec![json!("2026-08-01"), json!(10), json!(50), json!(3)],
                vec![json!("2026-08-04"), json!(12), json!(60), json!(4)],
            ],
        );
        let trend = dau_trend(&table);
        assert_eq!(trend.len(), 4);
        assert_eq!(trend[0].active_users, 10);
        assert_eq!(trend[1].active_users, 0);
        assert_eq!(trend[1].date, NaiveDate::from_ymd_opt(2026, 8, 2).unwrap());
        assert_eq!(trend[2].total_clicks, 0);
        assert_eq!(trend[3].active_users, 12);
    }

    #[test]
    fn test_cohort_split_preserved_and_gap_filled() {
        let table = Table::new(
            vec![
                "activity_date".into(),
                "new_users".into(),
                "returning_users".into(),
            ],
            vec![
                vec![json!("2026-08-01"), json!(1), json!(0)],
                vec![json!("2026-08-06"), json!(0), json!(1)],
            ],
        );
        let cohorts = user_cohorts(&table);
        assert_eq!(cohorts.len(), 6);
        assert_eq!((cohorts[0].new_users, cohorts[0].returning_users), (1, 0));
        assert_eq!((cohorts[5].new_users, cohorts[5].returning_users), (0, 1));
        assert!(cohorts[1..5]
            .iter()
            .all(|c| c.new_users == 0 && c.returning_users == 0));
    }

    #[test]
    fn test_top_apps_pct_and_ascending_order() {
        let table = Table::new(
            vec![
                "app_name".into(),
                "click_count".into(),
                "unique_users".into(),
                "active_days".into(),
            ],
            vec![
                vec![json!("alpha"), json!(75), json!(10), json!(5)],
                vec![json!("beta"), json!(25), json!(4), json!(3)],
            ],
        );
        let apps = top_apps(&table);
        assert_eq!(apps[0].app_name, "beta");
        assert_eq!(apps[0].pct_of_total, 25.0);
        assert_eq!(apps[1].pct_of_total, 75.0);
    }

    #[test]
    fn test_cost_trend_sums_across_apps() {
        let table = Table::new(
            vec![
                "usage_date".into(),
                "app_name".into(),
                "sku_name".into(),
                "total_dbus".into(),
                "estimated_cost_usd".into(),
            ],
            vec![
                vec![json!("2026-08-01"), json!("a"), json!("S1"), json!(4.0), json!(0.6)],
                vec![json!("2026-08-01"), json!("b"), json!("S1"), json!(7.0), json!(1.05)],
                vec![json!("2026-08-03"), json!("a"), json!("S1"), json!(2.0), json!(0.3)],
            ],
        );
        let trend = cost_trend(&table);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].total_dbus, 11.0);
        assert_eq!(trend[1].total_dbus, 0.0);

        let by_app = cost_by_app(&table);
        assert_eq!(by_app[0].app_name, "b");
        assert_eq!(by_app[1].total_dbus, 6.0);
    }

    #[test]
    fn test_tab_series_from_empty_bundle_is_well_defined() {
        let bundle = GroupBundle::empty(Generation(0), 30, "ws".into());
        for group in [
            DatasetGroupId::AppsUsage,
            DatasetGroupId::CostRoi,
            DatasetGroupId::Security,
            DatasetGroupId::WeeklyTrends,
        ] {
            // Must not panic; every chart gets an empty series.
            let series = tab_series(group, &bundle);
            assert!(serde_json::to_string(&series).is_ok());
        }
    }
}
