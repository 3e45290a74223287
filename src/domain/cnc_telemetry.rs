// CNC telemetry samples and the live-status summary derived from them
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::machine::MachineUpdate;

/// One correlated reading of every CNC sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub spindle_speed: f64,
    pub spindle_load: f64,
    pub feed_rate: f64,
    pub coolant_temp: f64,
    pub coolant_pressure: f64,
    pub x_axis_position: f64,
    pub y_axis_position: f64,
    pub z_axis_position: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub vibration_z: f64,
    pub power_consumption: f64,
    pub tool_number: i64,
    pub program_number: i64,
    pub part_count: i64,
    pub cycle_time: f64,
}

impl TelemetrySample {
    pub fn mean_vibration(&self) -> f64 {
        (self.vibration_x + self.vibration_y + self.vibration_z) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CncTelemetryRecord {
    pub id: i64,
    pub machine_id: i64,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub sample: TelemetrySample,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCncTelemetry {
    pub machine_id: i64,
    #[serde(flatten)]
    pub sample: TelemetrySample,
}

/// Summary fields written to the machine record after each generated sample
#[derive(Debug, Clone, PartialEq)]
pub struct MachineStatusUpdate {
    pub temperature: f64,
    pub vibration: f64,
    pub kw_used: f64,
    pub last_seen: DateTime<Utc>,
}

impl MachineStatusUpdate {
    pub fn from_sample(sample: &TelemetrySample, now: DateTime<Utc>) -> Self {
        Self {
            temperature: sample.coolant_temp + 20.0,
            vibration: sample.mean_vibration(),
            kw_used: sample.power_consumption,
            last_seen: now,
        }
    }
}

impl From<MachineStatusUpdate> for MachineUpdate {
    fn from(status: MachineStatusUpdate) -> Self {
        MachineUpdate {
            temperature: Some(status.temperature),
            vibration: Some(status.vibration),
            kw_used: Some(status.kw_used),
            last_seen: Some(status.last_seen),
            ..MachineUpdate::default()
        }
    }
}
