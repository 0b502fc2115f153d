use std::sync::Arc;

use crate::application::RecommendationService;
use crate::infrastructure::Config;

/// Process-wide, read-only state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub recommendation_service: Arc<RecommendationService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(recommendation_service: Arc<RecommendationService>, config: Config) -> Self {
        Self {
            recommendation_service,
            config: Arc::new(config),
        }
    }
}
