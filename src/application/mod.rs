// Application layer - Use cases over the repository ports
pub mod ai_service;
pub mod error;
pub mod fleet_service;
pub mod generation_service;
pub mod monitoring_repository;
pub mod prediction_client;
pub mod seed;
pub mod telemetry_service;
