use serde::Deserialize;
use std::time::Duration;

use crate::application::generation_service::GeneratorSettings;
use crate::application::seed::DEMO_MACHINE_KEY;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub generator: GeneratorConfig,
    pub uploads: UploadSettings,
    pub prediction: PredictionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    pub enabled: bool,
    pub machine_id: String,
    pub interval_secs: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            machine_key: self.machine_id.clone(),
            interval: Duration::from_secs(self.interval_secs.max(1)),
            seed: self.seed,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSettings {
    pub dir: String,
    pub max_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Defaults, then `config/monitor.*` if present, then `CNC_MONITOR__SECTION__KEY` variables
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    build_config(config::File::with_name("config/monitor").required(false))
}

fn build_config<S>(file: S) -> anyhow::Result<MonitorConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("database.path", "data/cnc-monitor.db")?
        .set_default("generator.enabled", true)?
        .set_default("generator.machine_id", DEMO_MACHINE_KEY)?
        .set_default("generator.interval_secs", 5_i64)?
        .set_default("uploads.dir", "uploads/ai-models")?
        .set_default("uploads.max_bytes", 500_i64 * 1024 * 1024)?
        .set_default("prediction.endpoint", "http://127.0.0.1:8500/predict")?
        .set_default("prediction.timeout_secs", 30_i64)?
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("CNC_MONITOR")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
