use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::preprocess::ImageTensor;
use super::FeatureExtractor;
use crate::domain::DomainError;
use crate::infrastructure::config::ModelConfig;

/// Feature extractor backed by a TensorFlow Serving REST endpoint hosting the pooled
/// ResNet50 model (`include_top=False, pooling='avg'`).
pub struct TfServingExtractor {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [&'a [Vec<[f32; 3]>]; 1],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

/// Servers return either a flat feature vector or one nested a level deeper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Prediction {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl TfServingExtractor {
    pub fn new(base_url: &str, model_name: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::embedding(format!("failed to build model client: {e}")))?;

        Ok(Self {
            client,
            endpoint: predict_url(base_url, model_name),
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self, DomainError> {
        Self::new(
            &config.url,
            &config.model_name,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn predict_url(base_url: &str, model_name: &str) -> String {
    format!(
        "{}/v1/models/{}:predict",
        base_url.trim_end_matches('/'),
        model_name
    )
}

fn flatten(response: PredictResponse) -> Result<Vec<f32>, DomainError> {
    let first = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::embedding("model returned no predictions"))?;

    Ok(match first {
        Prediction::Flat(v) => v,
        Prediction::Nested(v) => v.into_iter().flatten().collect(),
    })
}

#[async_trait]
impl FeatureExtractor for TfServingExtractor {
    #[instrument(skip(self, tensor), fields(endpoint = %self.endpoint))]
    async fn extract(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DomainError> {
        let nested = tensor.to_nested();
        let request = PredictRequest {
            instances: [nested.as_slice()],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::embedding("model request timed out")
                } else {
                    DomainError::embedding(format!("model request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(DomainError::embedding(format!("model error: {message}")));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(format!("invalid model response: {e}")))?;

        let features = flatten(body)?;
        debug!(features = features.len(), "prediction received");
        Ok(features)
    }
}
