use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub catalog_rows: usize,
    pub dimension: usize,
    pub default_k: usize,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// The service is only constructed from a fully loaded catalog, so reaching this handler
/// means the catalog is ready.
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let service = &state.recommendation_service;
    Json(ReadinessResponse {
        status: "ready".into(),
        catalog_rows: service.catalog_rows(),
        dimension: service.catalog_dimension(),
        default_k: service.default_k(),
    })
}
