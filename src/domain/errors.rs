use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed image: {0}")]
    MalformedImage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Row {0} has no identifier mapping")]
    UnmappedRow(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse tag for a [`DomainError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Embedding,
    Normalization,
    Index,
    Load,
    Internal,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn malformed_image(msg: impl Into<String>) -> Self {
        Self::MalformedImage(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn normalization(msg: impl Into<String>) -> Self {
        Self::Normalization(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MalformedImage(_) | Self::Embedding(_) => ErrorKind::Embedding,
            Self::Normalization(_) => ErrorKind::Normalization,
            Self::Index(_) | Self::DimensionMismatch { .. } => ErrorKind::Index,
            Self::Load(_) => ErrorKind::Load,
            Self::UnmappedRow(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the caller's input caused the failure.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MalformedImage(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
