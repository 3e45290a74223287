// AI model registry, insights and prediction
use crate::domain::ai::{
    AiInsight, AiModel, AiModelUpdate, AiStatus, MODEL_EXTENSIONS, NewAiInsight, NewAiModel, PredictionResult,
    model_extension,
};
use crate::infrastructure::model_storage::UploadError;
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, parse_body};
use crate::presentation::handlers::LimitQuery;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Multipart field carrying the model artifact
const UPLOAD_FIELD: &str = "model";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightQuery {
    pub machine_id: Option<i64>,
    pub limit: Option<usize>,
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<Vec<AiModel>>, ApiError> {
    Ok(Json(state.ai_service.list_models().await?))
}

pub async fn get_model(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Result<Json<AiModel>, ApiError> {
    Ok(Json(state.ai_service.get_model(id).await?))
}

pub async fn machine_models(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AiModel>>, ApiError> {
    Ok(Json(state.ai_service.models_for_machine(machine_id).await?))
}

pub async fn active_machine_model(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<AiModel>>, ApiError> {
    Ok(Json(state.ai_service.active_model(machine_id).await?))
}

pub async fn create_model(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAiModel>, JsonRejection>,
) -> Result<(StatusCode, Json<AiModel>), ApiError> {
    let model = parse_body(payload, "AI model")?;
    let created = state.ai_service.create_model(model).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Stream the `model` field to disk and attach it to the model row
pub async fn upload_model_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AiModel>, ApiError> {
    state.ai_service.get_model(id).await?;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        if model_extension(&original_name).is_none() {
            return Err(ApiError::BadRequest(format!(
                "Invalid file type. Allowed: {}",
                MODEL_EXTENSIONS.join(", ")
            )));
        }

        let mut upload = state
            .model_store
            .create(&original_name)
            .await
            .map_err(|e| ApiError::internal("Failed to upload model file", e))?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    upload.discard().await;
                    return Err(e.into());
                }
            };
            if let Err(e) = upload.write(&chunk).await {
                upload.discard().await;
                return Err(match e {
                    UploadError::TooLarge(_) => ApiError::Rejected {
                        status: StatusCode::PAYLOAD_TOO_LARGE,
                        message: "File too large".to_string(),
                    },
                    UploadError::Io(e) => ApiError::internal("Failed to upload model file", e),
                });
            }
        }

        let stored = upload
            .finish()
            .await
            .map_err(|e| ApiError::internal("Failed to upload model file", e))?;
        tracing::info!(model_id = id, size = stored.size, "Stored model file {}", stored.original_name);

        let model = state
            .ai_service
            .attach_file(id, stored)
            .await
            .map_err(|e| ApiError::from(e).context("Failed to upload model file"))?;
        return Ok(Json(model));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

pub async fn update_model(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AiModelUpdate>, JsonRejection>,
) -> Result<Json<AiModel>, ApiError> {
    let update = parse_body(payload, "update")?;
    Ok(Json(state.ai_service.update_model(id, update).await?))
}

pub async fn activate_model(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AiModel>, ApiError> {
    let model = state
        .ai_service
        .activate_model(id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to activate AI model"))?;
    Ok(Json(model))
}

pub async fn delete_model(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let model = state
        .ai_service
        .delete_model(id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to delete AI model"))?;

    if let Some(path) = model.file_path.as_deref() {
        // The row is already gone; a stray file is only worth a warning
        if let Err(e) = state.model_store.remove(path).await {
            tracing::warn!(model_id = id, "{:#}", e);
        }
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn list_insights(
    Query(query): Query<InsightQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AiInsight>>, ApiError> {
    let insights = state.ai_service.list_insights(query.machine_id, query.limit).await?;
    Ok(Json(insights))
}

pub async fn machine_insights(
    Path(machine_id): Path<i64>,
    Query(query): Query<LimitQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AiInsight>>, ApiError> {
    let insights = state.ai_service.list_insights(Some(machine_id), query.limit).await?;
    Ok(Json(insights))
}

pub async fn create_insight(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAiInsight>, JsonRejection>,
) -> Result<(StatusCode, Json<AiInsight>), ApiError> {
    let insight = parse_body(payload, "AI insight")?;
    let created = state.ai_service.create_insight(insight).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn acknowledge_insight(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AiInsight>, ApiError> {
    Ok(Json(state.ai_service.acknowledge_insight(id).await?))
}

pub async fn predict(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PredictionResult>, ApiError> {
    let prediction = state
        .ai_service
        .predict(machine_id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to run AI prediction"))?;
    Ok(Json(prediction))
}

pub async fn ai_status(
    Path(machine_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AiStatus>, ApiError> {
    let status = state
        .ai_service
        .status(machine_id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to get AI status"))?;
    Ok(Json(status))
}
