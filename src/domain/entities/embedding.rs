use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn l2_norm(&self) -> f64 {
        l2_norm(&self.0)
    }

    /// Rescales to unit L2 norm.
    ///
    /// Fails on a zero (or non-finite) norm instead of producing NaN/Inf components.
    pub fn normalized(&self) -> Result<Embedding> {
        normalize(&self.0).map(Embedding)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Accumulated in f64: products of f32 values neither overflow nor underflow there.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt()
}

pub fn normalize(v: &[f32]) -> Result<Vec<f32>> {
    if v.is_empty() {
        return Err(DomainError::normalization("empty embedding"));
    }

    let norm = l2_norm(v);
    if norm == 0.0 {
        return Err(DomainError::normalization("embedding has zero L2 norm"));
    }
    if !norm.is_finite() {
        return Err(DomainError::normalization(format!(
            "embedding has non-finite L2 norm ({norm})"
        )));
    }

    Ok(v.iter().map(|&x| (f64::from(x) / norm) as f32).collect())
}
