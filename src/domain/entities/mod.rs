mod catalog;
mod embedding;
mod recommendation;

pub use catalog::{Catalog, CatalogMatrix, IdentifierMapping};
pub use embedding::{dot, l2_norm, normalize, Embedding};
pub use recommendation::{
    Neighbor, Recommendation, RecommendationFailure, RecommendationSet, RequestStage, Upload,
};
