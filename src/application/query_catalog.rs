// Query catalog - pure construction of parameterized query definitions
use crate::domain::dataset::DatasetGroupId;

/// Estimated USD per DBU used for cost projections.
pub const DBU_COST_RATE: f64 = 0.15;

pub const TOP_APPS_LIMIT: i64 = 10;
pub const SEGMENTATION_LIMIT: i64 = 100;
pub const LIFECYCLE_EVENTS_LIMIT: i64 = 50;
pub const WEEKS_BACK: i64 = 12;

/// Immutable query definition. Rebuilt for every fetch; identical inputs
/// produce identical SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefinition {
    pub name: String,
    pub sql: String,
    pub days_back: i64,
    pub limit: Option<i64>,
    pub workspace_id: String,
}

impl QueryDefinition {
    fn new(name: &str, sql: String, days_back: i64, limit: Option<i64>, workspace_id: &str) -> Self {
        Self {
            name: name.to_string(),
            sql,
            days_back,
            limit,
            workspace_id: workspace_id.to_string(),
        }
    }
}

fn workspace_filter(workspace_id: &str) -> String {
    format!("AND workspace_id = '{workspace_id}'")
}

/// Same predicate with a table alias for joined queries.
fn workspace_filter_aliased(alias: &str, workspace_id: &str) -> String {
    format!("AND {alias}.workspace_id = '{workspace_id}'")
}

/// Aggregates over the current window plus the matching prior window so
/// the transform layer can derive growth percentages.
pub fn kpi_summary(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "WITH current_period AS (
            SELECT
                COUNT(DISTINCT user_identity.email) AS total_unique_users,
                COUNT(DISTINCT request_params.app_id) AS total_unique_apps,
                COUNT(*) AS total_interactions,
                ROUND(COUNT(*) * 1.0 / NULLIF(COUNT(DISTINCT user_identity.email), 0), 2) AS avg_interactions_per_user,
                ROUND(SUM(CASE WHEN response.status_code >= 400 OR response.error_message IS NOT NULL THEN 1 ELSE 0 END) * 100.0 / NULLIF(COUNT(*), 0), 2) AS overall_error_rate
            FROM system.access.audit
            WHERE service_name = 'apps'
                AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
                AND event_date < CURRENT_DATE
                {ws}
        ),
        previous_period AS (
            SELECT
                COUNT(DISTINCT user_identity.email) AS prev_users,
                COUNT(*) AS prev_interactions
            FROM system.access.audit
            WHERE service_name = 'apps'
                AND event_date >= CURRENT_DATE - INTERVAL '{prior}' DAY
                AND event_date < CURRENT_DATE - INTERVAL '{days_back}' DAY
                {ws}
        )
        SELECT c.*, p.prev_users, p.prev_interactions
        FROM current_period c
        CROSS JOIN previous_period p",
        prior = days_back * 2,
    );
    QueryDefinition::new("kpi_summary", sql, days_back, None, workspace_id)
}

/// One row per active calendar day. Days with no activity are absent
/// from the result and are zero-filled by the transform layer.
pub fn dau_trend(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            DATE(event_time) AS activity_date,
            COUNT(DISTINCT user_identity.email) AS daily_active_users,
            COUNT(*) AS total_clicks,
            COUNT(DISTINCT request_params.app_id) AS apps_accessed
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY DATE(event_time)
        ORDER BY activity_date ASC"
    );
    QueryDefinition::new("dau_trend", sql, days_back, None, workspace_id)
}

pub fn top_apps(days_back: i64, workspace_id: &str, limit: i64) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            COALESCE(request_params.app_name, request_params.app_id, 'Unknown App') AS app_name,
            COUNT(*) AS click_count,
            COUNT(DISTINCT user_identity.email) AS unique_users,
            COUNT(DISTINCT DATE(event_time)) AS active_days
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY COALESCE(request_params.app_name, request_params.app_id, 'Unknown App')
        ORDER BY click_count DESC
        LIMIT {limit}"
    );
    QueryDefinition::new("top_apps", sql, days_back, Some(limit), workspace_id)
}

pub fn usage_heatmap(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            DAYOFWEEK(event_time) AS day_of_week,
            CASE DAYOFWEEK(event_time)
                WHEN 1 THEN 'Sunday'
                WHEN 2 THEN 'Monday'
                WHEN 3 THEN 'Tuesday'
                WHEN 4 THEN 'Wednesday'
                WHEN 5 THEN 'Thursday'
                WHEN 6 THEN 'Friday'
                WHEN 7 THEN 'Saturday'
            END AS day_name,
            HOUR(event_time) AS hour_of_day,
            COUNT(*) AS click_count
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY DAYOFWEEK(event_time), day_name, HOUR(event_time)
        ORDER BY day_of_week, hour_of_day"
    );
    QueryDefinition::new("usage_heatmap", sql, days_back, None, workspace_id)
}

/// First-seen date splits each activity-day row into new vs returning.
/// A user counts as new on exactly one day, total.
pub fn user_cohorts(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let ws_aliased = workspace_filter_aliased("a", workspace_id);
    let sql = format!(
        "WITH user_first_interaction AS (
            SELECT
                user_identity.email,
                MIN(DATE(event_time)) AS first_interaction_date
            FROM system.access.audit
            WHERE service_name = 'apps'
                {ws}
            GROUP BY user_identity.email
        )
        SELECT
            DATE(a.event_time) AS activity_date,
            COUNT(DISTINCT CASE WHEN DATE(a.event_time) = ufi.first_interaction_date THEN a.user_identity.email END) AS new_users,
            COUNT(DISTINCT CASE WHEN DATE(a.event_time) > ufi.first_interaction_date THEN a.user_identity.email END) AS returning_users,
            COUNT(DISTINCT a.user_identity.email) AS total_users
        FROM system.access.audit a
        JOIN user_first_interaction ufi ON a.user_identity.email = ufi.email
        WHERE a.service_name = 'apps'
            AND a.event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws_aliased}
        GROUP BY DATE(a.event_time)
        ORDER BY activity_date ASC"
    );
    QueryDefinition::new("user_cohorts", sql, days_back, None, workspace_id)
}

pub fn error_monitoring(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            DATE(event_time) AS activity_date,
            COUNT(*) AS total_requests,
            SUM(CASE WHEN response.status_code BETWEEN 200 AND 299 THEN 1 ELSE 0 END) AS successful_requests,
            SUM(CASE WHEN response.status_code >= 400 OR response.error_message IS NOT NULL THEN 1 ELSE 0 END) AS failed_requests,
            ROUND(SUM(CASE WHEN response.status_code >= 400 OR response.error_message IS NOT NULL THEN 1 ELSE 0 END) * 100.0 / NULLIF(COUNT(*), 0), 2) AS error_rate_percentage
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY DATE(event_time)
        ORDER BY activity_date ASC"
    );
    QueryDefinition::new("error_monitoring", sql, days_back, None, workspace_id)
}

pub fn user_segmentation(days_back: i64, workspace_id: &str, limit: i64) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            user_identity.email AS user_email,
            COUNT(DISTINCT request_params.app_id) AS apps_accessed,
            COUNT(*) AS total_clicks,
            COUNT(DISTINCT DATE(event_time)) AS days_active,
            ROUND(COUNT(*) * 1.0 / NULLIF(COUNT(DISTINCT DATE(event_time)), 0), 2) AS avg_clicks_per_day,
            MAX(event_time) AS last_interaction
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY user_identity.email
        ORDER BY total_clicks DESC
        LIMIT {limit}"
    );
    QueryDefinition::new("user_segmentation", sql, days_back, Some(limit), workspace_id)
}

/// DBU usage per day, app, and SKU from the billing table.
pub fn cost_metrics(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let sql = format!(
        "SELECT
            DATE(usage_date) AS usage_date,
            COALESCE(usage_metadata.app_name, 'Unknown') AS app_name,
            sku_name,
            SUM(usage_quantity) AS total_dbus,
            ROUND(SUM(usage_quantity) * {DBU_COST_RATE}, 2) AS estimated_cost_usd
        FROM system.billing.usage
        WHERE usage_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            AND (usage_metadata.app_name IS NOT NULL OR sku_name LIKE '%APP%')
        GROUP BY DATE(usage_date), COALESCE(usage_metadata.app_name, 'Unknown'), sku_name
        ORDER BY usage_date DESC, total_dbus DESC"
    );
    QueryDefinition::new("cost_metrics", sql, days_back, None, workspace_id)
}

pub fn cost_summary(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let sql = format!(
        "SELECT
            SUM(usage_quantity) AS total_dbus,
            ROUND(SUM(usage_quantity) * {DBU_COST_RATE}, 2) AS total_cost_usd,
            COUNT(DISTINCT usage_metadata.app_name) AS apps_with_cost,
            ROUND(AVG(usage_quantity), 2) AS avg_daily_dbus
        FROM system.billing.usage
        WHERE usage_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            AND (usage_metadata.app_name IS NOT NULL OR sku_name LIKE '%APP%')"
    );
    QueryDefinition::new("cost_summary", sql, days_back, None, workspace_id)
}

pub fn security_events(days_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            DATE(event_time) AS event_date,
            action_name,
            COUNT(*) AS event_count,
            COUNT(DISTINCT user_identity.email) AS unique_users,
            SUM(CASE WHEN response.status_code >= 400 THEN 1 ELSE 0 END) AS failed_count
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            AND action_name IN ('loginApp', 'updateAppPermissions', 'deleteApp', 'createApp', 'deployApp')
            {ws}
        GROUP BY DATE(event_time), action_name
        ORDER BY event_date DESC, event_count DESC"
    );
    QueryDefinition::new("security_events", sql, days_back, None, workspace_id)
}

pub fn app_lifecycle_events(days_back: i64, workspace_id: &str, limit: i64) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let sql = format!(
        "SELECT
            DATE(event_time) AS event_date,
            action_name,
            COALESCE(request_params.app_name, request_params.app_id) AS app_name,
            user_identity.email AS performed_by,
            response.status_code AS status_code,
            event_time
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            AND action_name IN ('createApp', 'deleteApp', 'deployApp', 'startApp', 'stopApp')
            {ws}
        ORDER BY event_time DESC
        LIMIT {limit}"
    );
    QueryDefinition::new("app_lifecycle_events", sql, days_back, Some(limit), workspace_id)
}

pub fn weekly_trends(weeks_back: i64, workspace_id: &str) -> QueryDefinition {
    let ws = workspace_filter(workspace_id);
    let days_back = weeks_back * 7;
    let sql = format!(
        "SELECT
            DATE_TRUNC('week', event_time) AS week_start,
            COUNT(DISTINCT user_identity.email) AS weekly_users,
            COUNT(*) AS weekly_interactions,
            COUNT(DISTINCT request_params.app_id) AS weekly_active_apps,
            ROUND(SUM(CASE WHEN response.status_code >= 400 THEN 1 ELSE 0 END) * 100.0 / NULLIF(COUNT(*), 0), 2) AS weekly_error_rate
        FROM system.access.audit
        WHERE service_name = 'apps'
            AND event_date >= CURRENT_DATE - INTERVAL '{days_back}' DAY
            {ws}
        GROUP BY DATE_TRUNC('week', event_time)
        ORDER BY week_start ASC"
    );
    QueryDefinition::new("weekly_trends", sql, days_back, None, workspace_id)
}

/// All member queries for a dataset group, in `member_queries` order.
/// The DAU trend widens its window so short ranges still show a useful
/// trend line, capped at 90 days.
pub fn group_queries(
    group: DatasetGroupId,
    days_back: i64,
    workspace_id: &str,
) -> Vec<QueryDefinition> {
    match group {
        DatasetGroupId::AppsUsage => vec![
            kpi_summary(days_back, workspace_id),
            dau_trend((days_back * 3).min(90), workspace_id),
            top_apps(days_back, workspace_id, TOP_APPS_LIMIT),
            usage_heatmap(days_back, workspace_id),
            user_cohorts(days_back, workspace_id),
            error_monitoring(days_back, workspace_id),
            user_segmentation(days_back, workspace_id, SEGMENTATION_LIMIT),
        ],
        DatasetGroupId::CostRoi => vec![
            cost_summary(days_back, workspace_id),
            cost_metrics(days_back, workspace_id),
        ],
        DatasetGroupId::Security => vec![
            security_events(days_back, workspace_id),
            app_lifecycle_events(days_back, workspace_id, LIFECYCLE_EVENTS_LIMIT),
        ],
        DatasetGroupId::WeeklyTrends => vec![weekly_trends(WEEKS_BACK, workspace_id)],
    }
}
