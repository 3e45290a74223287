// Port for the external scoring service
use crate::domain::ai::{AiModel, PredictionResult};
use crate::domain::cnc_telemetry::CncTelemetryRecord;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest<'a> {
    pub machine_id: i64,
    pub model: &'a AiModel,
    pub telemetry: &'a [CncTelemetryRecord],
}

#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, request: PredictionRequest<'_>) -> anyhow::Result<PredictionResult>;
}
