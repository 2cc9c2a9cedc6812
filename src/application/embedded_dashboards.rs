// Embedded dashboard resolver - resolved once at startup
use crate::infrastructure::config::AppSettings;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Embedded,
    Placeholder,
}

/// Resolved reference to an externally hosted dashboard. Immutable for
/// the process lifetime; a restart is required to pick up changes.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddedDashboardRef {
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub url: String,
    pub external_url: String,
    pub enabled: bool,
    pub height: u32,
    pub background: String,
    pub render_mode: RenderMode,
}

pub fn resolve(settings: &AppSettings) -> Vec<EmbeddedDashboardRef> {
    resolve_with(settings, |key| std::env::var(key).ok())
}

/// Resolution with an injected environment lookup so precedence
/// (env override > config file value > empty) stays unit-testable.
/// The override variable for key `logfood_analytics` is
/// `LOGFOOD_ANALYTICS_URL`.
pub fn resolve_with(
    settings: &AppSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Vec<EmbeddedDashboardRef> {
    let mut keys: Vec<&String> = settings.dashboards.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let cfg = &settings.dashboards[key];
            let env_key = format!("{}_URL", key.to_uppercase());
            let url = env(&env_key).unwrap_or_else(|| cfg.url.clone());
            let render_mode = if !url.is_empty() && cfg.enabled {
                RenderMode::Embedded
            } else {
                RenderMode::Placeholder
            };
            EmbeddedDashboardRef {
                key: key.clone(),
                name: cfg.name.clone().unwrap_or_else(|| title_from_key(key)),
                description: cfg.description.clone().unwrap_or_default(),
                icon: cfg.icon.clone().unwrap_or_else(|| "bar-chart-line".to_string()),
                external_url: cfg.external_url.clone().unwrap_or_else(|| url.clone()),
                url,
                enabled: cfg.enabled,
                height: cfg.height,
                background: cfg.background.clone(),
                render_mode,
            }
        })
        .collect()
}

/// "logfood_analytics" -> "Logfood Analytics"
fn title_from_key(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
