// Application layer - Use cases and orchestration
pub mod data_store;
pub mod embedded_dashboards;
pub mod fetch_orchestrator;
pub mod query_catalog;
pub mod transforms;
pub mod warehouse_repository;
