// Repository traits for the relational store
use crate::domain::ai::{AiInsight, AiModel, AiModelUpdate, NewAiInsight, NewAiModel};
use crate::domain::alert::{Alert, NewAlert};
use crate::domain::cnc_telemetry::{CncTelemetryRecord, MachineStatusUpdate, NewCncTelemetry, TelemetrySample};
use crate::domain::machine::{Machine, MachineUpdate, NewMachine};
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenance};
use crate::domain::site::{NewSite, Site};
use crate::domain::telemetry::{NewTelemetryReading, TelemetryReading};
use async_trait::async_trait;

#[async_trait]
pub trait MonitoringRepository: Send + Sync {
    async fn list_sites(&self) -> anyhow::Result<Vec<Site>>;
    async fn get_site(&self, id: i64) -> anyhow::Result<Option<Site>>;
    async fn find_site_by_name(&self, name: &str) -> anyhow::Result<Option<Site>>;
    async fn create_site(&self, site: NewSite) -> anyhow::Result<Site>;

    async fn list_machines(&self) -> anyhow::Result<Vec<Machine>>;
    async fn list_machines_by_site(&self, site_id: i64) -> anyhow::Result<Vec<Machine>>;
    async fn get_machine(&self, id: i64) -> anyhow::Result<Option<Machine>>;
    /// Look up a machine by its stable external key
    async fn find_machine_by_key(&self, machine_key: &str) -> anyhow::Result<Option<Machine>>;
    async fn create_machine(&self, machine: NewMachine) -> anyhow::Result<Machine>;
    /// Returns `None` when the machine does not exist
    async fn update_machine(&self, id: i64, update: MachineUpdate) -> anyhow::Result<Option<Machine>>;

    /// Newest first
    async fn list_alerts(&self) -> anyhow::Result<Vec<Alert>>;
    async fn list_alerts_by_machine(&self, machine_id: i64) -> anyhow::Result<Vec<Alert>>;
    async fn create_alert(&self, alert: NewAlert) -> anyhow::Result<Alert>;
    async fn acknowledge_alert(
        &self,
        id: i64,
        acknowledged: bool,
        assigned_to: Option<String>,
    ) -> anyhow::Result<Option<Alert>>;

    /// Newest first
    async fn maintenance_history(&self, machine_id: i64) -> anyhow::Result<Vec<MaintenanceRecord>>;
    async fn create_maintenance(&self, record: NewMaintenance) -> anyhow::Result<MaintenanceRecord>;

    /// Latest `limit` readings, newest first
    async fn recent_telemetry(&self, machine_id: i64, limit: usize) -> anyhow::Result<Vec<TelemetryReading>>;
    async fn create_telemetry(&self, reading: NewTelemetryReading) -> anyhow::Result<TelemetryReading>;

    /// Latest `limit` CNC samples, newest first
    async fn recent_cnc_telemetry(&self, machine_id: i64, limit: usize) -> anyhow::Result<Vec<CncTelemetryRecord>>;
    /// Full history, oldest first
    async fn all_cnc_telemetry(&self, machine_id: i64) -> anyhow::Result<Vec<CncTelemetryRecord>>;
    async fn create_cnc_telemetry(&self, record: NewCncTelemetry) -> anyhow::Result<CncTelemetryRecord>;

    async fn list_ai_models(&self) -> anyhow::Result<Vec<AiModel>>;
    async fn get_ai_model(&self, id: i64) -> anyhow::Result<Option<AiModel>>;
    async fn ai_models_by_machine(&self, machine_id: i64) -> anyhow::Result<Vec<AiModel>>;
    async fn active_ai_model(&self, machine_id: i64) -> anyhow::Result<Option<AiModel>>;
    async fn create_ai_model(&self, model: NewAiModel) -> anyhow::Result<AiModel>;
    async fn update_ai_model(&self, id: i64, update: AiModelUpdate) -> anyhow::Result<Option<AiModel>>;
    /// Returns whether a row was removed
    async fn delete_ai_model(&self, id: i64) -> anyhow::Result<bool>;

    /// Newest first, optionally restricted to one machine
    async fn list_ai_insights(&self, machine_id: Option<i64>, limit: usize) -> anyhow::Result<Vec<AiInsight>>;
    async fn create_ai_insight(&self, insight: NewAiInsight) -> anyhow::Result<AiInsight>;
    async fn acknowledge_ai_insight(&self, id: i64) -> anyhow::Result<Option<AiInsight>>;
}

/// The three store calls the telemetry generator needs
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Resolve a machine key to its row id
    async fn resolve_machine(&self, machine_key: &str) -> anyhow::Result<Option<i64>>;

    async fn persist_sample(&self, machine_id: i64, sample: &TelemetrySample) -> anyhow::Result<()>;

    async fn update_machine_status(&self, machine_id: i64, status: MachineStatusUpdate) -> anyhow::Result<()>;
}
