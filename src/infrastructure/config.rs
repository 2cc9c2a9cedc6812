// Layered configuration: env overrides > config file > compiled defaults
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_DAYS_BACK: i64 = 30;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppSettings {
    #[serde(default)]
    pub dashboards: HashMap<String, DashboardSettings>,
    #[serde(default)]
    pub tab_order: Vec<String>,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub warehouse: WarehouseSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub url: String,
    pub external_url: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_height")]
    pub height: u32,
    #[serde(default = "default_dashboard_background")]
    pub background: String,
}

fn default_dashboard_height() -> u32 {
    800
}

fn default_dashboard_background() -> String {
    "#FFFFFF".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub interval_ms: u64,
    pub auto_refresh_enabled: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_ms: 300_000,
            auto_refresh_enabled: true,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub warehouse_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Compiled defaults, the bottom layer of the merge.
fn defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("refresh.interval_ms", 300_000_i64)?
        .set_default("refresh.auto_refresh_enabled", true)?
        .set_default("workspace.workspace_id", "1602460480284688")?
        .set_default("workspace.warehouse_id", "")?
        .set_default("warehouse.host", "")?
        .set_default("warehouse.token", "")?
        .set_default("warehouse.timeout_secs", 30_i64)?
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default(
            "tab_order",
            vec!["apps-usage", "cost-roi", "security", "weekly-trends"],
        )
}

/// Merge order is explicit: defaults first, then the optional config
/// file, then `ANALYTICS`-prefixed environment variables
/// (e.g. `ANALYTICS__REFRESH__INTERVAL_MS`).
pub fn load_settings() -> anyhow::Result<AppSettings> {
    let settings = defaults(config::Config::builder())?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("ANALYTICS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
