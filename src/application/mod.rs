//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete adapters, so the
//! recommendation pipeline can run against stub embedders and in-memory catalogs.

pub mod services;

pub use services::{RecommendationService, UploadValidator};
