// Main entry point - Dependency injection, event loop, and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::{mpsc, watch, RwLock};
use tower_http::trace::TraceLayer;

use crate::application::data_store::{DataStore, SharedDataStore};
use crate::application::embedded_dashboards;
use crate::application::fetch_orchestrator::FetchOrchestrator;
use crate::domain::filter::{DateRange, FilterState, TabId};
use crate::infrastructure::config::{load_settings, DEFAULT_DAYS_BACK};
use crate::infrastructure::sql_warehouse::SqlWarehouseClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_charts, get_dashboards, get_status, health_check, manual_refresh, update_filters,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = load_settings()?;

    // Create the warehouse client once; it is reused for every query.
    let repository = Arc::new(SqlWarehouseClient::new(
        settings.warehouse.host.clone(),
        settings.warehouse.token.clone(),
        settings.workspace.warehouse_id.clone(),
        Duration::from_secs(settings.warehouse.timeout_secs),
    )?);

    // Embedded dashboards resolve once; restart to pick up changes.
    let dashboards = embedded_dashboards::resolve(&settings);

    let store: SharedDataStore = Arc::new(RwLock::new(DataStore::new()));
    let (signal_tx, signal_rx) = mpsc::channel(32);
    let (outcome_tx, outcome_rx) = mpsc::channel(32);

    let filters = FilterState::new(
        DateRange::from_days(DEFAULT_DAYS_BACK).unwrap_or(DateRange::Days30),
        settings.refresh.auto_refresh_enabled,
        TabId::AppsUsage,
        settings.workspace.workspace_id.clone(),
    );
    let (filters_tx, filters_rx) = watch::channel(filters.clone());

    let orchestrator =
        FetchOrchestrator::new(repository, store.clone(), filters, outcome_tx, filters_tx);
    tokio::spawn(orchestrator.run(signal_rx, outcome_rx, settings.refresh.interval_ms));

    let state = Arc::new(AppState {
        store,
        signal_tx,
        filters_rx,
        dashboards,
    });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/charts/:tab", get(get_charts))
        .route("/dashboards", get(get_dashboards))
        .route("/status", get(get_status))
        .route("/refresh", post(manual_refresh))
        .route("/filters", post(update_filters))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = settings.server.bind.parse()?;
    tracing::info!("starting apps-analytics-hub on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
