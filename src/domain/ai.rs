// AI model metadata, insights and prediction results
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::is_severity;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_UPLOADED: &str = "uploaded";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// File extensions accepted for model artifacts
pub const MODEL_EXTENSIONS: [&str; 6] = [".pkl", ".h5", ".onnx", ".pt", ".joblib", ".json"];

pub fn is_model_status(value: &str) -> bool {
    matches!(value, STATUS_PENDING | STATUS_UPLOADED | STATUS_ACTIVE | STATUS_INACTIVE)
}

/// Lower-cased extension (with the dot) if it is an accepted model format
pub fn model_extension(file_name: &str) -> Option<String> {
    let ext = std::path::Path::new(file_name)
        .extension()?
        .to_str()?
        .to_lowercase();
    let ext = format!(".{}", ext);
    MODEL_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiModel {
    pub id: i64,
    pub machine_id: i64,
    pub name: String,
    pub version: String,
    pub model_type: String,
    pub description: Option<String>,
    pub status: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub accuracy: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAiModel {
    pub machine_id: i64,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub model_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl NewAiModel {
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.model_type.trim().is_empty()
            && self.accuracy.is_none_or(|a| (0.0..=1.0).contains(&a))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiModelUpdate {
    pub name: Option<String>,
    pub version: Option<String>,
    pub model_type: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub accuracy: Option<f64>,
}

impl AiModelUpdate {
    pub fn status(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status.as_deref().is_none_or(is_model_status)
            && self.accuracy.is_none_or(|a| (0.0..=1.0).contains(&a))
    }

    pub fn apply(self, model: &mut AiModel, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            model.name = name;
        }
        if let Some(version) = self.version {
            model.version = version;
        }
        if let Some(model_type) = self.model_type {
            model.model_type = model_type;
        }
        if self.description.is_some() {
            model.description = self.description;
        }
        if let Some(status) = self.status {
            model.status = status;
        }
        if self.file_path.is_some() {
            model.file_path = self.file_path;
        }
        if self.file_name.is_some() {
            model.file_name = self.file_name;
        }
        if self.file_size.is_some() {
            model.file_size = self.file_size;
        }
        if self.accuracy.is_some() {
            model.accuracy = self.accuracy;
        }
        model.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    pub id: i64,
    pub machine_id: i64,
    pub model_id: Option<i64>,
    pub insight_type: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub recommendation: Option<String>,
    pub confidence: Option<f64>,
    pub telemetry_snapshot: Option<String>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAiInsight {
    pub machine_id: i64,
    #[serde(default)]
    pub model_id: Option<i64>,
    pub insight_type: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub telemetry_snapshot: Option<String>,
}

impl NewAiInsight {
    pub fn is_valid(&self) -> bool {
        is_severity(&self.severity) && !self.title.trim().is_empty()
    }
}

/// Insight proposed by the scoring service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictedInsight {
    pub insight_type: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub health_score: f64,
    pub anomaly_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub insights: Vec<PredictedInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PredictionResult {
    /// Neutral answer given when a machine has no active model
    pub fn without_model() -> Self {
        Self {
            health_score: 1.0,
            anomaly_score: 0.0,
            confidence: 0.0,
            insights: Vec::new(),
            message: Some("No active AI model configured for this machine".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub has_active_model: bool,
    pub active_model: Option<AiModel>,
    pub total_models: usize,
    pub model_status: String,
}

impl AiStatus {
    pub fn new(active_model: Option<AiModel>, total_models: usize) -> Self {
        let model_status = active_model
            .as_ref()
            .map(|m| m.status.clone())
            .unwrap_or_else(|| "none".to_string());
        Self {
            has_active_model: active_model.is_some(),
            active_model,
            total_models,
            model_status,
        }
    }
}
