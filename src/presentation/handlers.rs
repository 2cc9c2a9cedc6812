// HTTP request handlers - the render bindings boundary
use crate::application::embedded_dashboards::EmbeddedDashboardRef;
use crate::application::fetch_orchestrator::Signal;
use crate::application::transforms;
use crate::domain::dataset::ConnectionStatus;
use crate::domain::filter::{DateRange, FilterState, TabId};
use crate::domain::series::TabSeries;
use crate::presentation::app_state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub struct ChartsResponse {
    pub fetched_at: Option<DateTime<Utc>>,
    pub degraded: Vec<String>,
    #[serde(flatten)]
    pub series: TabSeries,
}

/// Transformed chart series for one data-backed tab. Raw rows never
/// cross this boundary; an unfetched tab renders well-defined empty
/// series.
pub async fn get_charts(
    Path(tab): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(tab) = TabId::from_slug(&tab) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(group) = tab.dataset_group() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let store = state.store.read().await;
    let response = match store.bundle(group) {
        Some(bundle) => ChartsResponse {
            fetched_at: Some(bundle.fetched_at),
            degraded: bundle.degraded.clone(),
            series: transforms::tab_series(group, bundle),
        },
        None => {
            let filters = state.filters_rx.borrow().clone();
            let bundle = crate::domain::dataset::GroupBundle::empty(
                filters.generation,
                filters.date_range.days(),
                filters.workspace_id,
            );
            ChartsResponse {
                fetched_at: None,
                degraded: Vec::new(),
                series: transforms::tab_series(group, &bundle),
            }
        }
    };
    Json(response).into_response()
}

/// Embedded dashboard references, resolved once at startup.
pub async fn get_dashboards(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<EmbeddedDashboardRef>> {
    Json(state.dashboards.clone())
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub connection: ConnectionStatus,
    pub filters: FilterState,
    pub last_fetch: HashMap<&'static str, DateTime<Utc>>,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let store = state.store.read().await;
    Json(StatusResponse {
        connection: store.status(),
        filters: state.filters_rx.borrow().clone(),
        last_fetch: store.last_fetch_times(),
    })
}

/// Manual refresh always fetches, even with auto refresh off and a
/// fresh bundle.
pub async fn manual_refresh(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.signal_tx.send(Signal::ManualRefresh).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterUpdate {
    pub date_range_days: Option<i64>,
    pub active_tab: Option<String>,
    pub auto_refresh_enabled: Option<bool>,
}

/// Filter changes from the UI. The date-range signal is sent before the
/// tab switch so a simultaneous change and switch still forces a fetch.
pub async fn update_filters(
    State(state): State<Arc<AppState>>,
    Json(update): Json<FilterUpdate>,
) -> impl IntoResponse {
    let mut signals = Vec::new();

    if let Some(days) = update.date_range_days {
        let Some(range) = DateRange::from_days(days) else {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unsupported date range: {days} days"),
            )
                .into_response();
        };
        signals.push(Signal::DateRangeChanged(range));
    }
    if let Some(slug) = &update.active_tab {
        let Some(tab) = TabId::from_slug(slug) else {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown tab: {slug}"),
            )
                .into_response();
        };
        signals.push(Signal::TabSwitched(tab));
    }
    if let Some(enabled) = update.auto_refresh_enabled {
        signals.push(Signal::AutoRefreshToggled(enabled));
    }

    for signal in signals {
        if state.signal_tx.send(signal).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    StatusCode::ACCEPTED.into_response()
}
