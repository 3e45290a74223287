// Generic machine telemetry readings
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub id: i64,
    pub machine_id: i64,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub kw_used: Option<f64>,
    pub runtime: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTelemetryReading {
    pub machine_id: i64,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub kw_used: Option<f64>,
    #[serde(default)]
    pub runtime: Option<f64>,
}
