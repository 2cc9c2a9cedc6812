// SQL warehouse client over the statement execution REST API
use crate::application::query_catalog::QueryDefinition;
use crate::application::warehouse_repository::{StoreError, WarehouseRepository};
use crate::domain::table::Table;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SqlWarehouseClient {
    client: reqwest::Client,
    host: String,
    token: String,
    warehouse_id: String,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct StatementErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Deserialize)]
struct Schema {
    columns: Vec<Column>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
}

impl SqlWarehouseClient {
    /// Built once at startup and reused for every query. The client
    /// carries a bounded per-request timeout; expiry is reported as a
    /// connection failure.
    pub fn new(
        host: String,
        token: String,
        warehouse_id: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            token,
            warehouse_id,
        })
    }
}

fn table_from_response(data: StatementResponse) -> Result<Table, StoreError> {
    match data.status.state.as_str() {
        "SUCCEEDED" => {
            let columns = data
                .manifest
                .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
                .unwrap_or_default();
            // A missing result block is a valid zero-row outcome.
            let rows = data.result.map(|r| r.data_array).unwrap_or_default();
            Ok(Table::new(columns, rows))
        }
        state => {
            let message = data
                .status
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("statement finished in state {state}"));
            Err(StoreError::Query(message))
        }
    }
}

#[async_trait]
impl WarehouseRepository for SqlWarehouseClient {
    async fn execute(&self, query: &QueryDefinition) -> Result<Table, StoreError> {
        let url = format!("{}/api/2.0/sql/statements", self.host);
        let body = serde_json::json!({
            "statement": query.sql,
            "warehouse_id": self.warehouse_id,
            "wait_timeout": "30s",
            "format": "JSON_ARRAY",
        });

        tracing::debug!(query = %query.name, days_back = query.days_back, "executing statement");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("status {status}: {detail}")));
        }

        let data: StatementResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Query(format!("malformed response: {e}")))?;
        table_from_response(data)
    }
}
