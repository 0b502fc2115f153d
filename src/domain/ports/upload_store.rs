use async_trait::async_trait;

use crate::domain::errors::DomainError;

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persists an uploaded image and returns the reference it can be fetched back by.
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, DomainError>;
}
