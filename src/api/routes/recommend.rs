use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{ErrorKind, Recommendation, RecommendationSet, Upload};

pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct RecommendQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub id: usize,
    pub item_ref: String,
    pub image_url: String,
    pub similarity: f32,
}

impl From<Recommendation> for RecommendationResponse {
    fn from(rec: Recommendation) -> Self {
        Self {
            id: rec.index,
            image_url: format!("/api/images/{}", rec.item_ref),
            item_ref: rec.item_ref,
            similarity: rec.similarity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub uploaded_image_url: Option<String>,
    pub recommendations: Vec<RecommendationResponse>,
}

impl From<RecommendationSet> for RecommendResponse {
    fn from(set: RecommendationSet) -> Self {
        Self {
            success: true,
            uploaded_image_url: set
                .uploaded_image_ref
                .map(|name| format!("/api/uploads/{name}")),
            recommendations: set.recommendations.into_iter().map(Into::into).collect(),
        }
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), ErrorKind::Validation, e.body_text())
}

/// Pulls the `file` field out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;

        let mut upload = Upload::new(filename, bytes.to_vec());
        if let Some(content_type) = content_type {
            upload = upload.with_content_type(content_type);
        }
        return Ok(upload);
    }

    Err(ApiError::bad_request("No file uploaded"))
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;

    let set = state
        .recommendation_service
        .recommend(upload, query.k)
        .await?;

    Ok(Json(set.into()))
}
