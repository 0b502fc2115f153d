use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::preprocess::{preprocess, ImageTensor};
use super::FeatureExtractor;
use crate::domain::{ports::ImageEmbedder, DomainError, Embedding};
use crate::infrastructure::config::ModelConfig;

/// Image embedder for a ResNet50 feature model: decode, preprocess, extract.
///
/// Decoding and preprocessing run on the blocking pool. When `serialize` is set, extractor
/// calls are funnelled through a mutex for models that cannot run concurrently.
pub struct ResNetEmbedder {
    extractor: Arc<dyn FeatureExtractor>,
    input_size: u32,
    dimension: usize,
    gate: Option<Mutex<()>>,
}

impl ResNetEmbedder {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, dimension: usize) -> Self {
        Self {
            extractor,
            input_size: 224,
            dimension,
            gate: None,
        }
    }

    pub fn from_config(extractor: Arc<dyn FeatureExtractor>, config: &ModelConfig) -> Self {
        Self::new(extractor, config.dimension)
            .with_input_size(config.input_size)
            .with_serialized_inference(config.serialize_inference)
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_serialized_inference(mut self, serialize: bool) -> Self {
        self.gate = serialize.then(|| Mutex::new(()));
        self
    }

    async fn extract(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DomainError> {
        match &self.gate {
            Some(gate) => {
                let _guard = gate.lock().await;
                self.extractor.extract(tensor).await
            }
            None => self.extractor.extract(tensor).await,
        }
    }
}

#[async_trait]
impl ImageEmbedder for ResNetEmbedder {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn embed(&self, image: &[u8]) -> Result<Embedding, DomainError> {
        let bytes = image.to_vec();
        let size = self.input_size;
        let tensor = tokio::task::spawn_blocking(move || preprocess(&bytes, size))
            .await
            .map_err(|e| DomainError::internal(format!("preprocessing task failed: {e}")))??;

        let features = self.extract(&tensor).await?;
        if features.len() != self.dimension {
            return Err(DomainError::embedding(format!(
                "model returned {} features, expected {}",
                features.len(),
                self.dimension
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::embedding("model returned non-finite features"));
        }

        debug!(dim = features.len(), "image embedded");
        Ok(Embedding::new(features))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
