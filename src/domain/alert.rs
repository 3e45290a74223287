// Alert domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub machine_id: i64,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub acknowledged: bool,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub machine_id: i64,
    pub severity: String,
    pub title: String,
    pub message: String,
}

impl NewAlert {
    pub fn is_valid(&self) -> bool {
        is_severity(&self.severity) && !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertAcknowledgement {
    pub acknowledged: bool,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Severities shared by alerts and AI insights
pub fn is_severity(value: &str) -> bool {
    matches!(value, "info" | "warning" | "critical")
}
