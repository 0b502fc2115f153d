use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Maps encoded image bytes to a raw (unnormalized) embedding of fixed dimension.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed(&self, image: &[u8]) -> Result<Embedding, DomainError>;
    fn dimension(&self) -> usize;
}
