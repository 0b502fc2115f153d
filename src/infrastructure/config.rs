use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "VISUAL_RECS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub uploads: UploadConfig,
    pub model: ModelConfig,
    pub recommend: RecommendConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub matrix_path: PathBuf,
    pub mapping_path: PathBuf,
    pub image_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    /// MIME types accepted when the client declares one on the multipart field.
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub url: String,
    pub model_name: String,
    pub dimension: usize,
    pub input_size: u32,
    pub timeout_seconds: u64,
    /// Serialize inference calls for models that are not reentrant.
    pub serialize_inference: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub default_k: usize,
    pub max_k: usize,
    /// Fail a request when a returned row has no mapping instead of dropping it.
    pub strict_mapping: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            matrix_path: PathBuf::from("fashion_features.npy"),
            mapping_path: PathBuf::from("fashion_item_mapping.json"),
            image_dir: PathBuf::from("images"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/uploads"),
            allowed_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            allowed_content_types: vec![
                "image/png".into(),
                "image/jpeg".into(),
                "application/octet-stream".into(),
            ],
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8501".to_string(),
            model_name: "resnet50".to_string(),
            dimension: 2048,
            input_size: 224,
            timeout_seconds: 30,
            serialize_inference: false,
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            default_k: 6,
            max_k: 100,
            strict_mapping: false,
        }
    }
}

impl Config {
    /// Loads the YAML file named by `VISUAL_RECS_CONFIG` (or `config/default.yaml` when it
    /// exists), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overrides fields from environment variables looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "SERVER_PORT",
                value: port,
            })?;
        }
        if let Some(path) = var("FEATURE_MATRIX_PATH") {
            self.catalog.matrix_path = path.into();
        }
        if let Some(path) = var("MAPPING_PATH") {
            self.catalog.mapping_path = path.into();
        }
        if let Some(dir) = var("IMAGE_DIR") {
            self.catalog.image_dir = dir.into();
        }
        if let Some(dir) = var("UPLOAD_DIR") {
            self.uploads.dir = dir.into();
        }
        if let Some(url) = var("MODEL_URL") {
            self.model.url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.dimension == 0 {
            return Err(ConfigError::Invalid("model.dimension must be positive".into()));
        }
        if self.model.input_size == 0 {
            return Err(ConfigError::Invalid("model.input_size must be positive".into()));
        }
        if self.recommend.default_k == 0 {
            return Err(ConfigError::Invalid(
                "recommend.default_k must be positive".into(),
            ));
        }
        if self.recommend.default_k > self.recommend.max_k {
            return Err(ConfigError::Invalid(format!(
                "recommend.default_k ({}) exceeds recommend.max_k ({})",
                self.recommend.default_k, self.recommend.max_k
            )));
        }
        if self.uploads.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "uploads.allowed_extensions must not be empty".into(),
            ));
        }
        if self.uploads.allowed_content_types.is_empty() {
            return Err(ConfigError::Invalid(
                "uploads.allowed_content_types must not be empty".into(),
            ));
        }
        Ok(())
    }
}
