// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_response;
pub mod model_storage;
pub mod prediction_http;
pub mod sqlite_repository;
