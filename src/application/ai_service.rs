// AI service - Model registry, insights and prediction forwarding
use crate::application::error::{ServiceError, ServiceResult, invalid, not_found};
use crate::application::monitoring_repository::MonitoringRepository;
use crate::application::prediction_client::{PredictionClient, PredictionRequest};
use crate::domain::ai::{
    AiInsight, AiModel, AiModelUpdate, AiStatus, NewAiInsight, NewAiModel, PredictionResult, STATUS_ACTIVE,
    STATUS_UPLOADED,
};
use std::sync::Arc;

/// Number of recent CNC samples sent to the scoring service
pub const PREDICTION_WINDOW: usize = 20;
pub const DEFAULT_INSIGHT_LIMIT: usize = 50;
const MAX_INSIGHT_LIMIT: usize = 10_000;

/// Model artifact already written to storage
#[derive(Debug, Clone)]
pub struct StoredModelFile {
    pub path: String,
    pub original_name: String,
    pub size: i64,
}

#[derive(Clone)]
pub struct AiService {
    repository: Arc<dyn MonitoringRepository>,
    predictor: Arc<dyn PredictionClient>,
}

impl AiService {
    pub fn new(repository: Arc<dyn MonitoringRepository>, predictor: Arc<dyn PredictionClient>) -> Self {
        Self { repository, predictor }
    }

    pub async fn list_models(&self) -> ServiceResult<Vec<AiModel>> {
        Ok(self.repository.list_ai_models().await?)
    }

    pub async fn get_model(&self, id: i64) -> ServiceResult<AiModel> {
        self.repository.get_ai_model(id).await?.ok_or_else(|| not_found("AI model"))
    }

    pub async fn models_for_machine(&self, machine_id: i64) -> ServiceResult<Vec<AiModel>> {
        Ok(self.repository.ai_models_by_machine(machine_id).await?)
    }

    pub async fn active_model(&self, machine_id: i64) -> ServiceResult<Option<AiModel>> {
        Ok(self.repository.active_ai_model(machine_id).await?)
    }

    pub async fn create_model(&self, model: NewAiModel) -> ServiceResult<AiModel> {
        if !model.is_valid() || self.repository.get_machine(model.machine_id).await?.is_none() {
            tracing::warn!(machine_id = model.machine_id, "Rejected AI model registration");
            return Err(invalid("AI model"));
        }
        Ok(self.repository.create_ai_model(model).await?)
    }

    pub async fn update_model(&self, id: i64, update: AiModelUpdate) -> ServiceResult<AiModel> {
        if !update.is_valid() {
            return Err(invalid("update"));
        }
        self.repository
            .update_ai_model(id, update)
            .await?
            .ok_or_else(|| not_found("AI model"))
    }

    pub async fn attach_file(&self, id: i64, file: StoredModelFile) -> ServiceResult<AiModel> {
        let update = AiModelUpdate {
            file_path: Some(file.path),
            file_name: Some(file.original_name),
            file_size: Some(file.size),
            ..AiModelUpdate::status(STATUS_UPLOADED)
        };
        self.repository
            .update_ai_model(id, update)
            .await?
            .ok_or_else(|| not_found("AI model"))
    }

    /// Make `id` the only active model of its machine
    pub async fn activate_model(&self, id: i64) -> ServiceResult<AiModel> {
        let model = self.get_model(id).await?;

        for other in self.repository.ai_models_by_machine(model.machine_id).await? {
            if other.id != id && other.status == STATUS_ACTIVE {
                self.repository
                    .update_ai_model(other.id, AiModelUpdate::status(STATUS_UPLOADED))
                    .await?;
            }
        }

        let activated = self
            .repository
            .update_ai_model(id, AiModelUpdate::status(STATUS_ACTIVE))
            .await?
            .ok_or_else(|| not_found("AI model"))?;
        tracing::info!(model_id = id, machine_id = activated.machine_id, "Activated AI model");
        Ok(activated)
    }

    /// Remove the row; returns the deleted model so its file can be cleaned up
    pub async fn delete_model(&self, id: i64) -> ServiceResult<AiModel> {
        let model = self.get_model(id).await?;
        if !self.repository.delete_ai_model(id).await? {
            return Err(not_found("AI model"));
        }
        Ok(model)
    }

    pub async fn list_insights(&self, machine_id: Option<i64>, limit: Option<usize>) -> ServiceResult<Vec<AiInsight>> {
        let limit = limit.unwrap_or(DEFAULT_INSIGHT_LIMIT).clamp(1, MAX_INSIGHT_LIMIT);
        Ok(self.repository.list_ai_insights(machine_id, limit).await?)
    }

    pub async fn create_insight(&self, insight: NewAiInsight) -> ServiceResult<AiInsight> {
        if !insight.is_valid() || self.repository.get_machine(insight.machine_id).await?.is_none() {
            tracing::warn!(machine_id = insight.machine_id, "Rejected AI insight");
            return Err(invalid("AI insight"));
        }
        if let Some(model_id) = insight.model_id {
            if self.repository.get_ai_model(model_id).await?.is_none() {
                tracing::warn!(machine_id = insight.machine_id, model_id, "Rejected AI insight for unknown model");
                return Err(invalid("AI insight"));
            }
        }
        Ok(self.repository.create_ai_insight(insight).await?)
    }

    pub async fn acknowledge_insight(&self, id: i64) -> ServiceResult<AiInsight> {
        self.repository
            .acknowledge_ai_insight(id)
            .await?
            .ok_or_else(|| not_found("AI insight"))
    }

    /// Score the latest CNC window with the machine's active model.
    ///
    /// Non-informational insights are stored with a snapshot of the newest sample.
    pub async fn predict(&self, machine_id: i64) -> ServiceResult<PredictionResult> {
        if self.repository.get_machine(machine_id).await?.is_none() {
            return Err(not_found("Machine"));
        }

        let telemetry = self.repository.recent_cnc_telemetry(machine_id, PREDICTION_WINDOW).await?;
        let Some(latest) = telemetry.first() else {
            return Err(ServiceError::Invalid("No telemetry data available for prediction".to_string()));
        };

        let Some(model) = self.repository.active_ai_model(machine_id).await? else {
            return Ok(PredictionResult::without_model());
        };

        let prediction = self
            .predictor
            .predict(PredictionRequest {
                machine_id,
                model: &model,
                telemetry: &telemetry,
            })
            .await?;

        let snapshot = serde_json::to_string(latest).map_err(anyhow::Error::from)?;
        for insight in prediction.insights.iter().filter(|i| i.severity != "info") {
            self.repository
                .create_ai_insight(NewAiInsight {
                    machine_id,
                    model_id: Some(model.id),
                    insight_type: insight.insight_type.clone(),
                    severity: insight.severity.clone(),
                    title: insight.title.clone(),
                    description: insight.description.clone(),
                    recommendation: insight.recommendation.clone(),
                    confidence: Some(prediction.confidence),
                    telemetry_snapshot: Some(snapshot.clone()),
                })
                .await?;
        }

        tracing::info!(
            machine_id,
            model_id = model.id,
            health_score = prediction.health_score,
            anomaly_score = prediction.anomaly_score,
            "AI prediction completed"
        );
        Ok(prediction)
    }

    pub async fn status(&self, machine_id: i64) -> ServiceResult<AiStatus> {
        let active = self.repository.active_ai_model(machine_id).await?;
        let total = self.repository.ai_models_by_machine(machine_id).await?.len();
        Ok(AiStatus::new(active, total))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::monitoring_repository::TelemetrySink;
    use crate::domain::ai::PredictedInsight;
    use crate::domain::cnc_telemetry::tests::sample;
    use crate::infrastructure::sqlite_repository::SqliteRepository;
    use crate::infrastructure::sqlite_repository::tests::insert_machine;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scoring stub that records the window it was given
    #[derive(Default)]
    pub(crate) struct StubPredictor {
        pub(crate) windows: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl PredictionClient for StubPredictor {
        async fn predict(&self, request: PredictionRequest<'_>) -> anyhow::Result<PredictionResult> {
            self.windows.lock().unwrap().push(request.telemetry.len());
            Ok(PredictionResult {
                health_score: 0.62,
                anomaly_score: 0.41,
                confidence: 0.88,
                insights: vec![
                    PredictedInsight {
                        insight_type: "tool_wear".to_string(),
                        severity: "warning".to_string(),
                        title: "Tool wear rising".to_string(),
                        description: "Spindle load trending up".to_string(),
                        recommendation: Some("Inspect tool 4".to_string()),
                    },
                    PredictedInsight {
                        insight_type: "summary".to_string(),
                        severity: "info".to_string(),
                        title: "Cycle nominal".to_string(),
                        description: "No other findings".to_string(),
                        recommendation: None,
                    },
                ],
                message: None,
            })
        }
    }

    fn new_model(machine_id: i64, name: &str) -> NewAiModel {
        NewAiModel {
            machine_id,
            name: name.to_string(),
            version: "1.0.0".to_string(),
            model_type: "anomaly_detection".to_string(),
            description: None,
            accuracy: Some(0.93),
        }
    }

    async fn setup() -> (Arc<SqliteRepository>, Arc<StubPredictor>, AiService, i64) {
        let repo = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let machine = insert_machine(&repo, "HAAS-VF2-001").await;
        let predictor = Arc::new(StubPredictor::default());
        let service = AiService::new(repo.clone(), predictor.clone());
        (repo, predictor, service, machine.id)
    }

    #[tokio::test]
    async fn test_activation_is_exclusive() {
        let (_repo, _predictor, service, machine_id) = setup().await;
        let first = service.create_model(new_model(machine_id, "first")).await.unwrap();
        let second = service.create_model(new_model(machine_id, "second")).await.unwrap();
        assert_eq!(first.status, "pending");

        service.activate_model(first.id).await.unwrap();
        service.activate_model(second.id).await.unwrap();

        assert_eq!(service.get_model(first.id).await.unwrap().status, STATUS_UPLOADED);
        assert_eq!(service.get_model(second.id).await.unwrap().status, STATUS_ACTIVE);
        let status = service.status(machine_id).await.unwrap();
        assert!(status.has_active_model);
        assert_eq!(status.total_models, 2);
        assert_eq!(status.active_model.map(|m| m.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_predict_without_telemetry_is_invalid() {
        let (_repo, _predictor, service, machine_id) = setup().await;
        assert!(matches!(service.predict(machine_id).await, Err(ServiceError::Invalid(_))));
        assert!(matches!(service.predict(machine_id + 1).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_neutral() {
        let (repo, predictor, service, machine_id) = setup().await;
        repo.persist_sample(machine_id, &sample()).await.unwrap();

        let result = service.predict(machine_id).await.unwrap();
        assert_eq!(result, PredictionResult::without_model());
        assert!(predictor.windows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_predict_stores_actionable_insights() {
        let (repo, predictor, service, machine_id) = setup().await;
        for _ in 0..25 {
            repo.persist_sample(machine_id, &sample()).await.unwrap();
        }
        let model = service.create_model(new_model(machine_id, "wear")).await.unwrap();
        service.activate_model(model.id).await.unwrap();

        let result = service.predict(machine_id).await.unwrap();
        assert_eq!(result.health_score, 0.62);
        assert_eq!(*predictor.windows.lock().unwrap(), vec![PREDICTION_WINDOW]);

        let insights = service.list_insights(Some(machine_id), None).await.unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].severity, "warning");
        assert_eq!(insights[0].model_id, Some(model.id));
        let snapshot: serde_json::Value =
            serde_json::from_str(insights[0].telemetry_snapshot.as_deref().unwrap()).unwrap();
        assert_eq!(snapshot["spindleSpeed"], 8123.5);
    }

    fn new_insight(machine_id: i64, model_id: Option<i64>) -> NewAiInsight {
        NewAiInsight {
            machine_id,
            model_id,
            insight_type: "anomaly".to_string(),
            severity: "warning".to_string(),
            title: "Vibration spike".to_string(),
            description: "Z axis vibration above baseline".to_string(),
            recommendation: None,
            confidence: Some(0.7),
            telemetry_snapshot: None,
        }
    }

    #[tokio::test]
    async fn test_insight_with_unknown_model_is_invalid() {
        let (_repo, _predictor, service, machine_id) = setup().await;
        let err = service.create_insight(new_insight(machine_id, Some(999))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(ref m) if m == "Invalid AI insight data"));

        let model = service.create_model(new_model(machine_id, "wear")).await.unwrap();
        let created = service.create_insight(new_insight(machine_id, Some(model.id))).await.unwrap();
        assert_eq!(created.model_id, Some(model.id));
    }

    #[tokio::test]
    async fn test_insight_limit_is_clamped() {
        let (repo, _predictor, service, machine_id) = setup().await;
        for _ in 0..3 {
            service.create_insight(new_insight(machine_id, None)).await.unwrap();
        }

        // An out-of-range limit never reaches the store unclamped
        assert!(repo.list_ai_insights(None, usize::MAX).await.is_err());
        assert_eq!(service.list_insights(None, Some(usize::MAX)).await.unwrap().len(), 3);
        assert_eq!(service.list_insights(Some(machine_id), Some(0)).await.unwrap().len(), 1);
        assert_eq!(service.list_insights(None, Some(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_model() {
        let (_repo, _predictor, service, machine_id) = setup().await;
        let model = service.create_model(new_model(machine_id, "old")).await.unwrap();
        let deleted = service.delete_model(model.id).await.unwrap();
        assert_eq!(deleted.id, model.id);
        assert!(matches!(service.get_model(model.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete_model(model.id).await, Err(ServiceError::NotFound(_))));
    }
}
