// Control of the background CNC data generator
use crate::presentation::app_state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorStatus {
    pub running: bool,
    pub machine_id: String,
}

async fn status(state: &AppState) -> GeneratorStatus {
    GeneratorStatus {
        running: state.generator.is_running().await,
        machine_id: state.generator.machine_key().to_string(),
    }
}

pub async fn generator_status(State(state): State<Arc<AppState>>) -> Json<GeneratorStatus> {
    Json(status(&state).await)
}

/// Starting an already running generator restarts its timer
pub async fn start_generator(State(state): State<Arc<AppState>>) -> Json<GeneratorStatus> {
    state.generator.start_generation().await;
    Json(status(&state).await)
}

pub async fn stop_generator(State(state): State<Arc<AppState>>) -> Json<GeneratorStatus> {
    state.generator.stop_generation().await;
    Json(status(&state).await)
}
