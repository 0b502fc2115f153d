mod recommendation;
mod validation;

pub use recommendation::RecommendationService;
pub use validation::UploadValidator;
