// Fleet service - Sites, machines, alerts and maintenance records
use crate::application::error::{ServiceResult, invalid, not_found};
use crate::application::monitoring_repository::MonitoringRepository;
use crate::domain::alert::{Alert, AlertAcknowledgement, NewAlert};
use crate::domain::machine::{Machine, MachineUpdate, NewMachine};
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenance};
use crate::domain::site::{NewSite, Site};
use std::sync::Arc;

#[derive(Clone)]
pub struct FleetService {
    repository: Arc<dyn MonitoringRepository>,
}

impl FleetService {
    pub fn new(repository: Arc<dyn MonitoringRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_sites(&self) -> ServiceResult<Vec<Site>> {
        Ok(self.repository.list_sites().await?)
    }

    pub async fn get_site(&self, id: i64) -> ServiceResult<Site> {
        self.repository.get_site(id).await?.ok_or_else(|| not_found("Site"))
    }

    pub async fn create_site(&self, site: NewSite) -> ServiceResult<Site> {
        if !site.is_valid() {
            return Err(invalid("site"));
        }
        Ok(self.repository.create_site(site).await?)
    }

    pub async fn list_machines(&self) -> ServiceResult<Vec<Machine>> {
        Ok(self.repository.list_machines().await?)
    }

    pub async fn machines_for_site(&self, site_id: i64) -> ServiceResult<Vec<Machine>> {
        Ok(self.repository.list_machines_by_site(site_id).await?)
    }

    pub async fn get_machine(&self, id: i64) -> ServiceResult<Machine> {
        self.repository.get_machine(id).await?.ok_or_else(|| not_found("Machine"))
    }

    pub async fn create_machine(&self, machine: NewMachine) -> ServiceResult<Machine> {
        if !machine.is_valid() {
            return Err(invalid("machine"));
        }
        if let Some(site_id) = machine.site_id {
            if self.repository.get_site(site_id).await?.is_none() {
                return Err(invalid("machine"));
            }
        }
        if self.repository.find_machine_by_key(&machine.machine_id).await?.is_some() {
            return Err(invalid("machine"));
        }
        Ok(self.repository.create_machine(machine).await?)
    }

    pub async fn update_machine(&self, id: i64, update: MachineUpdate) -> ServiceResult<Machine> {
        if !update.is_valid() {
            return Err(invalid("update"));
        }
        if let Some(site_id) = update.site_id {
            if self.repository.get_site(site_id).await?.is_none() {
                tracing::warn!(machine_id = id, site_id, "Rejected machine update for unknown site");
                return Err(invalid("update"));
            }
        }
        self.repository
            .update_machine(id, update)
            .await?
            .ok_or_else(|| not_found("Machine"))
    }

    pub async fn list_alerts(&self) -> ServiceResult<Vec<Alert>> {
        Ok(self.repository.list_alerts().await?)
    }

    pub async fn alerts_for_machine(&self, machine_id: i64) -> ServiceResult<Vec<Alert>> {
        Ok(self.repository.list_alerts_by_machine(machine_id).await?)
    }

    pub async fn create_alert(&self, alert: NewAlert) -> ServiceResult<Alert> {
        if !alert.is_valid() || !self.machine_exists(alert.machine_id).await? {
            return Err(invalid("alert"));
        }
        Ok(self.repository.create_alert(alert).await?)
    }

    pub async fn acknowledge_alert(&self, id: i64, ack: AlertAcknowledgement) -> ServiceResult<Alert> {
        self.repository
            .acknowledge_alert(id, ack.acknowledged, ack.assigned_to)
            .await?
            .ok_or_else(|| not_found("Alert"))
    }

    pub async fn maintenance_history(&self, machine_id: i64) -> ServiceResult<Vec<MaintenanceRecord>> {
        Ok(self.repository.maintenance_history(machine_id).await?)
    }

    pub async fn create_maintenance(&self, record: NewMaintenance) -> ServiceResult<MaintenanceRecord> {
        if !record.is_valid() || !self.machine_exists(record.machine_id).await? {
            tracing::warn!(machine_id = record.machine_id, "Rejected maintenance record");
            return Err(invalid("maintenance"));
        }
        Ok(self.repository.create_maintenance(record).await?)
    }

    async fn machine_exists(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.repository.get_machine(id).await?.is_some())
    }
}
