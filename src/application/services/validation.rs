use crate::domain::{DomainError, Upload};

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
/// `application/octet-stream` is what many clients send when they do not sniff the file.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 3] =
    ["image/png", "image/jpeg", "application/octet-stream"];
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Screens uploads before any decoding: filename, extension and MIME allowlists, size.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
    max_bytes: usize,
}

impl UploadValidator {
    pub fn new<I, S>(allowed_extensions: I, max_bytes: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            max_bytes,
        }
    }

    /// Replaces the MIME allowlist. Uploads that declare no content type are judged by
    /// extension alone.
    pub fn with_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_content_types = content_types
            .into_iter()
            .map(|t| media_type(t.as_ref()))
            .collect();
        self
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn validate(&self, upload: &Upload) -> Result<(), DomainError> {
        if upload.filename.trim().is_empty() {
            return Err(DomainError::validation("No selected file"));
        }

        let allowed = upload
            .extension()
            .is_some_and(|ext| self.allowed_extensions.iter().any(|a| *a == ext));
        if !allowed {
            return Err(DomainError::validation(format!(
                "Invalid file type; allowed: {}",
                self.allowed_extensions.join(", ")
            )));
        }

        if let Some(declared) = upload.content_type.as_deref() {
            let declared = media_type(declared);
            if !self.allowed_content_types.contains(&declared) {
                return Err(DomainError::validation(format!(
                    "Invalid content type {declared}; allowed: {}",
                    self.allowed_content_types.join(", ")
                )));
            }
        }

        if upload.bytes.is_empty() {
            return Err(DomainError::validation("Uploaded file is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(DomainError::validation(format!(
                "Uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }

        Ok(())
    }
}

/// `image/PNG; charset=x` -> `image/png`
fn media_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UploadValidator {
        UploadValidator::new(["png", ".JPG", "jpeg"], 8)
    }

    #[test]
    fn test_accepts_allowed_extensions_case_insensitively() {
        let v = validator();
        assert!(v.validate(&Upload::new("a.png", vec![1])).is_ok());
        assert!(v.validate(&Upload::new("b.JPG", vec![1])).is_ok());
        assert!(v.validate(&Upload::new("c.Jpeg", vec![1])).is_ok());
    }

    #[test]
    fn test_rejects_disallowed_or_missing_extension() {
        let v = validator();
        for name in ["a.gif", "a", "png", "a.png.exe"] {
            let err = v.validate(&Upload::new(name, vec![1])).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{name}");
        }
    }

    #[test]
    fn test_rejects_empty_filename_and_body() {
        let v = validator();
        assert!(v.validate(&Upload::new("", vec![1])).is_err());
        assert!(v.validate(&Upload::new("a.png", vec![])).is_err());
    }

    #[test]
    fn test_content_type_allowlist() {
        let v = validator();
        let upload = |ct: &str| Upload::new("a.png", vec![1]).with_content_type(ct);

        assert!(v.validate(&upload("image/png")).is_ok());
        assert!(v.validate(&upload("IMAGE/JPEG; charset=binary")).is_ok());
        assert!(v.validate(&upload("application/octet-stream")).is_ok());
        assert!(v.validate(&Upload::new("a.png", vec![1])).is_ok());

        for ct in ["image/gif", "text/html", "application/pdf"] {
            let err = v.validate(&upload(ct)).unwrap_err();
            assert!(err.to_string().contains("content type"), "{ct}");
        }
    }

    #[test]
    fn test_custom_content_types_replace_defaults() {
        let v = validator().with_content_types(["image/png"]);
        let upload = Upload::new("a.png", vec![1]).with_content_type("application/octet-stream");
        assert!(v.validate(&upload).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let v = validator();
        assert!(v.validate(&Upload::new("a.png", vec![0; 8])).is_ok());
        assert!(v.validate(&Upload::new("a.png", vec![0; 9])).is_err());
    }
}
