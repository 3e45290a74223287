// Machine domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: i64,
    /// Stable external key, e.g. "HAAS-VF2-001"
    pub machine_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub status: String,
    pub site_id: Option<i64>,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub runtime: Option<f64>,
    pub efficiency: Option<f64>,
    pub kw_used: Option<f64>,
    pub firmware: Option<String>,
    pub model: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMachine {
    pub machine_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub efficiency: Option<f64>,
    #[serde(default)]
    pub kw_used: Option<f64>,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_status() -> String {
    "offline".to_string()
}

impl NewMachine {
    pub fn is_valid(&self) -> bool {
        !self.machine_id.trim().is_empty() && !self.name.trim().is_empty() && is_status(&self.status)
    }
}

pub fn is_status(value: &str) -> bool {
    matches!(value, "online" | "offline" | "warning" | "error" | "maintenance")
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
    pub site_id: Option<i64>,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub runtime: Option<f64>,
    pub efficiency: Option<f64>,
    pub kw_used: Option<f64>,
    pub firmware: Option<String>,
    pub model: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl MachineUpdate {
    pub fn is_valid(&self) -> bool {
        self.status.as_deref().is_none_or(is_status)
    }

    pub fn apply(self, machine: &mut Machine) {
        if let Some(name) = self.name {
            machine.name = name;
        }
        if let Some(status) = self.status {
            machine.status = status;
        }
        if self.site_id.is_some() {
            machine.site_id = self.site_id;
        }
        if self.temperature.is_some() {
            machine.temperature = self.temperature;
        }
        if self.vibration.is_some() {
            machine.vibration = self.vibration;
        }
        if self.runtime.is_some() {
            machine.runtime = self.runtime;
        }
        if self.efficiency.is_some() {
            machine.efficiency = self.efficiency;
        }
        if self.kw_used.is_some() {
            machine.kw_used = self.kw_used;
        }
        if self.firmware.is_some() {
            machine.firmware = self.firmware;
        }
        if self.model.is_some() {
            machine.model = self.model;
        }
        if self.last_seen.is_some() {
            machine.last_seen = self.last_seen;
        }
    }
}
