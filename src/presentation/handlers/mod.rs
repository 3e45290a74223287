// HTTP request handlers
pub mod ai;
pub mod fleet;
pub mod generator;
pub mod telemetry;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}
