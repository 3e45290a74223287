// Telemetry service - Generic readings and CNC sample history
use crate::application::error::{ServiceError, ServiceResult, invalid};
use crate::application::monitoring_repository::MonitoringRepository;
use crate::domain::cnc_telemetry::{CncTelemetryRecord, NewCncTelemetry};
use crate::domain::telemetry::{NewTelemetryReading, TelemetryReading};
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 10_000;

#[derive(Clone)]
pub struct TelemetryService {
    repository: Arc<dyn MonitoringRepository>,
}

impl TelemetryService {
    pub fn new(repository: Arc<dyn MonitoringRepository>) -> Self {
        Self { repository }
    }

    pub async fn recent_readings(&self, machine_id: i64, limit: Option<usize>) -> ServiceResult<Vec<TelemetryReading>> {
        Ok(self.repository.recent_telemetry(machine_id, clamp_limit(limit)).await?)
    }

    pub async fn record_reading(&self, reading: NewTelemetryReading) -> ServiceResult<TelemetryReading> {
        if self.repository.get_machine(reading.machine_id).await?.is_none() {
            return Err(invalid("telemetry"));
        }
        Ok(self.repository.create_telemetry(reading).await?)
    }

    pub async fn recent_cnc_samples(&self, machine_id: i64, limit: Option<usize>) -> ServiceResult<Vec<CncTelemetryRecord>> {
        Ok(self.repository.recent_cnc_telemetry(machine_id, clamp_limit(limit)).await?)
    }

    pub async fn all_cnc_samples(&self, machine_id: i64) -> ServiceResult<Vec<CncTelemetryRecord>> {
        Ok(self.repository.all_cnc_telemetry(machine_id).await?)
    }

    pub async fn record_cnc_sample(&self, record: NewCncTelemetry) -> ServiceResult<CncTelemetryRecord> {
        if self.repository.get_machine(record.machine_id).await?.is_none() {
            return Err(invalid("CNC telemetry"));
        }
        Ok(self.repository.create_cnc_telemetry(record).await?)
    }

    /// Full history for export; empty history is reported as not found
    pub async fn export_rows(&self, machine_id: i64) -> ServiceResult<Vec<CncTelemetryRecord>> {
        let rows = self.repository.all_cnc_telemetry(machine_id).await?;
        if rows.is_empty() {
            return Err(ServiceError::NotFound("No telemetry data found".to_string()));
        }
        Ok(rows)
    }
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitoring_repository::TelemetrySink;
    use crate::domain::cnc_telemetry::tests::sample;
    use crate::infrastructure::sqlite_repository::SqliteRepository;
    use crate::infrastructure::sqlite_repository::tests::insert_machine;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(20)), 20);
        assert_eq!(clamp_limit(Some(1_000_000)), MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_export_requires_history() {
        let repo = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let machine = insert_machine(&repo, "HAAS-VF2-001").await;
        let service = TelemetryService::new(repo.clone());

        assert!(matches!(service.export_rows(machine.id).await, Err(ServiceError::NotFound(_))));

        for part in 0..3 {
            let mut s = sample();
            s.part_count = part;
            repo.persist_sample(machine.id, &s).await.unwrap();
        }
        let rows = service.export_rows(machine.id).await.unwrap();
        let parts: Vec<i64> = rows.iter().map(|r| r.sample.part_count).collect();
        assert_eq!(parts, vec![0, 1, 2]);

        let recent = service.recent_cnc_samples(machine.id, Some(2)).await.unwrap();
        let parts: Vec<i64> = recent.iter().map(|r| r.sample.part_count).collect();
        assert_eq!(parts, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_reading_for_unknown_machine_rejected() {
        let repo = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let service = TelemetryService::new(repo);
        let reading = NewTelemetryReading {
            machine_id: 7,
            temperature: Some(40.0),
            vibration: None,
            kw_used: None,
            runtime: None,
        };
        assert!(matches!(service.record_reading(reading).await, Err(ServiceError::Invalid(_))));
    }
}
