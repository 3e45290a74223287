// Maintenance record domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: i64,
    pub machine_id: i64,
    pub maintenance_type: String,
    pub description: String,
    pub technician: Option<String>,
    pub cost: Option<f64>,
    pub performed_at: DateTime<Utc>,
    pub next_due: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenance {
    pub machine_id: i64,
    pub maintenance_type: String,
    pub description: String,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    /// Defaults to the time of insertion
    #[serde(default)]
    pub performed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
}

impl NewMaintenance {
    pub fn is_valid(&self) -> bool {
        !self.maintenance_type.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.cost.is_none_or(|c| c >= 0.0)
    }
}
