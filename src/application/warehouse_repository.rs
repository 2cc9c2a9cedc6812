// Repository trait for analytic warehouse access
use crate::application::query_catalog::QueryDefinition;
use crate::domain::table::Table;
use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by the warehouse. Both kinds are handled
/// identically at the single-query boundary: the named table degrades
/// to empty. A zero-row result is not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("warehouse unreachable: {0}")]
    Connection(String),
    #[error("query rejected: {0}")]
    Query(String),
}

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// Execute one query definition and return its rows.
    async fn execute(&self, query: &QueryDefinition) -> Result<Table, StoreError>;
}
