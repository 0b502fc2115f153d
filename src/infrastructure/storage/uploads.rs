use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{ports::UploadStore, DomainError};

/// Stores uploads as files in a single directory under sanitized, uniquified names.
pub struct LocalUploadStore {
    dir: PathBuf,
}

impl LocalUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::internal(format!(
                "cannot create upload dir {}: {e}",
                self.dir.display()
            ))
        })
    }
}

/// Reduces a client-supplied filename to ASCII alphanumerics, `.`, `-` and `_`, with no
/// path components and no leading dots.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, DomainError> {
        let safe = secure_filename(filename);
        let name = if safe.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            format!("{}_{safe}", Uuid::new_v4().simple())
        };

        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            DomainError::internal(format!("cannot store upload {}: {e}", path.display()))
        })?;

        debug!(name = %name, bytes = bytes.len(), "upload stored");
        Ok(name)
    }
}
