// HTTP client for the external scoring service
use crate::application::prediction_client::{PredictionClient, PredictionRequest};
use crate::domain::ai::PredictionResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPredictionClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build prediction HTTP client")?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, request: PredictionRequest<'_>) -> Result<PredictionResult> {
        tracing::debug!(
            machine_id = request.machine_id,
            model_id = request.model.id,
            window = request.telemetry.len(),
            "Sending telemetry window to {}",
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to scoring service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Scoring service failed with status {}: {}", status, body);
        }

        response
            .json::<PredictionResult>()
            .await
            .context("Failed to parse scoring service response")
    }
}
