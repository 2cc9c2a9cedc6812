// Application state for HTTP handlers
use crate::application::data_store::SharedDataStore;
use crate::application::embedded_dashboards::EmbeddedDashboardRef;
use crate::application::fetch_orchestrator::Signal;
use crate::domain::filter::FilterState;
use tokio::sync::{mpsc, watch};

pub struct AppState {
    pub store: SharedDataStore,
    pub signal_tx: mpsc::Sender<Signal>,
    pub filters_rx: watch::Receiver<FilterState>,
    pub dashboards: Vec<EmbeddedDashboardRef>,
}
