pub mod catalog;
pub mod config;
pub mod embedding;
pub mod index;
pub mod storage;

pub use catalog::load_catalog;
pub use config::{Config, ConfigError};
pub use embedding::{FeatureExtractor, ResNetEmbedder, TfServingExtractor};
pub use index::BruteForceIndex;
pub use storage::LocalUploadStore;
