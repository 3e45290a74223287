// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::application::ai_service::AiService;
use crate::application::fleet_service::FleetService;
use crate::application::generation_service::CncDataGenerator;
use crate::application::seed::seed_cnc_machine;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::model_storage::ModelFileStore;
use crate::infrastructure::prediction_http::HttpPredictionClient;
use crate::infrastructure::sqlite_repository::SqliteRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_monitor_config()?;

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }

    // Infrastructure layer
    let repository = Arc::new(SqliteRepository::open(&config.database.path).await?);
    let predictor = Arc::new(HttpPredictionClient::new(
        config.prediction.endpoint.clone(),
        Duration::from_secs(config.prediction.timeout_secs),
    )?);
    let model_store = ModelFileStore::new(&config.uploads.dir, config.uploads.max_bytes).await?;

    seed_cnc_machine(repository.as_ref(), &config.generator.machine_id).await?;

    // Application layer
    let generator = Arc::new(CncDataGenerator::new(repository.clone(), config.generator.settings()));
    let state = Arc::new(AppState {
        fleet_service: FleetService::new(repository.clone()),
        telemetry_service: TelemetryService::new(repository.clone()),
        ai_service: AiService::new(repository.clone(), predictor),
        generator: generator.clone(),
        model_store,
    });

    if config.generator.enabled {
        generator.start_generation().await;
    }

    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("Starting cnc-monitor service on {}", config.server.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    generator.stop_generation().await;
    tracing::info!("cnc-monitor service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
