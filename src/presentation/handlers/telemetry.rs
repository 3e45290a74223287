// Generic readings and CNC samples
use crate::domain::cnc_telemetry::{CncTelemetryRecord, NewCncTelemetry};
use crate::domain::telemetry::{NewTelemetryReading, TelemetryReading};
use crate::infrastructure::http_response::{XLSX_CONTENT_TYPE, attachment_response, cnc_telemetry_workbook};
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, parse_body};
use crate::presentation::handlers::LimitQuery;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

const EXPORT_FILE_NAME: &str = "cnc_telemetry_data.xlsx";

pub async fn machine_telemetry(
    Path(machine_id): Path<i64>,
    Query(query): Query<LimitQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TelemetryReading>>, ApiError> {
    let readings = state.telemetry_service.recent_readings(machine_id, query.limit).await?;
    Ok(Json(readings))
}

pub async fn create_telemetry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTelemetryReading>, JsonRejection>,
) -> Result<(StatusCode, Json<TelemetryReading>), ApiError> {
    let reading = parse_body(payload, "telemetry")?;
    let created = state.telemetry_service.record_reading(reading).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn cnc_telemetry(
    Path(machine_id): Path<i64>,
    Query(query): Query<LimitQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CncTelemetryRecord>>, ApiError> {
    let samples = state
        .telemetry_service
        .recent_cnc_samples(machine_id, query.limit)
        .await?;
    Ok(Json(samples))
}

pub async fn all_cnc_telemetry(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CncTelemetryRecord>>, ApiError> {
    Ok(Json(state.telemetry_service.all_cnc_samples(machine_id).await?))
}

pub async fn create_cnc_telemetry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCncTelemetry>, JsonRejection>,
) -> Result<(StatusCode, Json<CncTelemetryRecord>), ApiError> {
    let record = parse_body(payload, "CNC telemetry")?;
    let created = state.telemetry_service.record_cnc_sample(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Download every CNC sample of a machine as a spreadsheet
pub async fn export_cnc_telemetry(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let records = state
        .telemetry_service
        .export_rows(machine_id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to export telemetry data"))?;

    // Workbook encoding is CPU-bound
    let bytes = tokio::task::spawn_blocking(move || cnc_telemetry_workbook(&records))
        .await
        .map_err(|e| ApiError::internal("Failed to export telemetry data", e))?
        .map_err(|e| ApiError::internal("Failed to export telemetry data", e))?;

    tracing::debug!(machine_id, bytes = bytes.len(), "Exported CNC telemetry workbook");
    match attachment_response(bytes, XLSX_CONTENT_TYPE, EXPORT_FILE_NAME) {
        Ok(response) => Ok(response),
        Err(status) => Ok(status.into_response()),
    }
}
