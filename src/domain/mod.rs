// Domain layer - Dashboard data models
pub mod dataset;
pub mod filter;
pub mod series;
pub mod table;
