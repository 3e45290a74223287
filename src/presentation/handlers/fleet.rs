// Sites, machines, alerts and maintenance
use crate::domain::alert::{Alert, AlertAcknowledgement, NewAlert};
use crate::domain::machine::{Machine, MachineUpdate, NewMachine};
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenance};
use crate::domain::site::{NewSite, Site};
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, parse_body};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;

pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Site>>, ApiError> {
    let sites = state.fleet_service.list_sites().await?;
    Ok(Json(sites))
}

pub async fn get_site(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Result<Json<Site>, ApiError> {
    Ok(Json(state.fleet_service.get_site(id).await?))
}

pub async fn create_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewSite>, JsonRejection>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    let site = parse_body(payload, "site")?;
    let created = state.fleet_service.create_site(site).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn site_machines(
    Path(site_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Machine>>, ApiError> {
    Ok(Json(state.fleet_service.machines_for_site(site_id).await?))
}

pub async fn list_machines(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Machine>>, ApiError> {
    Ok(Json(state.fleet_service.list_machines().await?))
}

pub async fn get_machine(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Result<Json<Machine>, ApiError> {
    Ok(Json(state.fleet_service.get_machine(id).await?))
}

pub async fn create_machine(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewMachine>, JsonRejection>,
) -> Result<(StatusCode, Json<Machine>), ApiError> {
    let machine = parse_body(payload, "machine")?;
    let created = state.fleet_service.create_machine(machine).await?;
    tracing::info!(id = created.id, "Registered machine {}", created.machine_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_machine(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MachineUpdate>, JsonRejection>,
) -> Result<Json<Machine>, ApiError> {
    let update = parse_body(payload, "machine")?;
    Ok(Json(state.fleet_service.update_machine(id, update).await?))
}

pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Alert>>, ApiError> {
    Ok(Json(state.fleet_service.list_alerts().await?))
}

pub async fn machine_alerts(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    Ok(Json(state.fleet_service.alerts_for_machine(machine_id).await?))
}

pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let alert = parse_body(payload, "alert")?;
    let created = state.fleet_service.create_alert(alert).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn acknowledge_alert(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AlertAcknowledgement>, JsonRejection>,
) -> Result<Json<Alert>, ApiError> {
    let ack = parse_body(payload, "alert")?;
    Ok(Json(state.fleet_service.acknowledge_alert(id, ack).await?))
}

pub async fn maintenance_history(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    Ok(Json(state.fleet_service.maintenance_history(machine_id).await?))
}

pub async fn create_maintenance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewMaintenance>, JsonRejection>,
) -> Result<(StatusCode, Json<MaintenanceRecord>), ApiError> {
    let record = parse_body(payload, "maintenance")?;
    let created = state.fleet_service.create_maintenance(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
