pub mod preprocess;
mod resnet;
mod tf_serving;

use async_trait::async_trait;

use crate::domain::DomainError;

pub use preprocess::{preprocess, ImageTensor};
pub use resnet::ResNetEmbedder;
pub use tf_serving::TfServingExtractor;

/// The model itself: preprocessed image tensor in, pooled feature vector out.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DomainError>;
}
