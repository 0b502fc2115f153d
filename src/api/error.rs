use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{DomainError, ErrorKind, RecommendationFailure, RequestStage};

/// JSON error body returned by every API failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<RequestStage>,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                success: false,
                error: kind,
                stage: None,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::Validation, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(error: &DomainError) -> StatusCode {
    if error.is_client_fault() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::new(status_for(&error), error.kind(), error.to_string())
    }
}

impl From<RecommendationFailure> for ApiError {
    fn from(failure: RecommendationFailure) -> Self {
        let mut err = Self::from(failure.error);
        err.body.stage = Some(failure.stage);
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.body.message, "request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}
