// Application state for HTTP handlers
use crate::application::ai_service::AiService;
use crate::application::fleet_service::FleetService;
use crate::application::generation_service::CncDataGenerator;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::model_storage::ModelFileStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub fleet_service: FleetService,
    pub telemetry_service: TelemetryService,
    pub ai_service: AiService,
    pub generator: Arc<CncDataGenerator>,
    pub model_store: ModelFileStore,
}
