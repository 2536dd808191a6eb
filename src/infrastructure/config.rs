use crate::application::annotation_service::EngineSettings;
use crate::domain::series::WindowPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub source: SourceSettings,
    pub window: WindowPolicy,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub archive_url: String,
    pub forecast_url: String,
    pub variable: String,
    /// Zone of the returned timestamps; instants are matched against them as-is
    pub timezone: String,
    pub timeout_secs: u64,
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub max_concurrent_fetches: usize,
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            window: self.window,
            max_concurrent_fetches: self.engine.max_concurrent_fetches,
        }
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("source.archive_url", "https://archive-api.open-meteo.com/v1/era5")?
        .set_default("source.forecast_url", "https://api.open-meteo.com/v1/forecast")?
        .set_default("source.variable", "temperature_2m")?
        .set_default("source.timezone", "GMT")?
        .set_default("source.timeout_secs", 10)?
        .set_default("window.past_days", 14)?
        .set_default("window.future_days", 15)?
        .set_default("engine.max_concurrent_fetches", 4)
}

/// Defaults, then `config/annotator.*` if present, then `ANNOTATOR__*` env vars
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = with_defaults(config::Config::builder())?
        .add_source(config::File::with_name("config/annotator").required(false))
        .add_source(config::Environment::with_prefix("ANNOTATOR").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
