use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ErrorKind};

/// One hit from a similarity index: catalog row and its cosine distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

impl Neighbor {
    pub fn new(index: usize, distance: f32) -> Self {
        Self { index, distance }
    }

    /// `1 - distance`. Not clamped: slightly negative distances yield scores above 1.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub index: usize,
    pub item_ref: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub uploaded_image_ref: Option<String>,
    pub recommendations: Vec<Recommendation>,
}

/// An uploaded query image as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lowercased extension after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.filename.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

/// Where a recommendation request is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Received,
    Validated,
    Embedded,
    Normalized,
    Searched,
    Resolved,
    Completed,
}

impl RequestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Embedded => "embedded",
            Self::Normalized => "normalized",
            Self::Searched => "searched",
            Self::Resolved => "resolved",
            Self::Completed => "completed",
        }
    }
}

/// Terminal failure of a request: the last stage reached and the error that stopped it.
#[derive(Debug, thiserror::Error)]
#[error("recommendation failed after stage {}: {error}", .stage.as_str())]
pub struct RecommendationFailure {
    pub stage: RequestStage,
    #[source]
    pub error: DomainError,
}

impl RecommendationFailure {
    pub fn new(stage: RequestStage, error: DomainError) -> Self {
        Self { stage, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
