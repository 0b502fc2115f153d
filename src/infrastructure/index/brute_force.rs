use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;

use crate::domain::{
    dot, ports::SimilarityIndex, CatalogMatrix, DomainError, Embedding, Neighbor,
};

/// Exact cosine-distance search by linear scan over every catalog row.
///
/// Suitable up to the low tens of thousands of rows. Rows with a zero norm sit at distance
/// 1.0 from every query.
pub struct BruteForceIndex {
    matrix: Arc<CatalogMatrix>,
}

impl BruteForceIndex {
    pub fn new(matrix: Arc<CatalogMatrix>) -> Self {
        Self { matrix }
    }

    fn cosine_distance(&self, query: &[f32], query_norm: f64, row: usize) -> f32 {
        let row_norm = self.matrix.norm_at(row);
        if row_norm == 0.0 {
            return 1.0;
        }
        (1.0 - dot(query, self.matrix.vector_at(row)) / (query_norm * row_norm)) as f32
    }
}

/// Ascending distance, then ascending row index.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

impl SimilarityIndex for BruteForceIndex {
    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>, DomainError> {
        if self.matrix.is_empty() {
            return Err(DomainError::index("catalog is empty"));
        }
        if query.dimension() != self.matrix.dimension() {
            return Err(DomainError::DimensionMismatch {
                expected: self.matrix.dimension(),
                actual: query.dimension(),
            });
        }

        let query_norm = query.l2_norm();
        if query_norm == 0.0 || !query_norm.is_finite() {
            return Err(DomainError::normalization(
                "query vector has no usable L2 norm",
            ));
        }

        let k = k.min(self.matrix.row_count());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = (0..self.matrix.row_count())
            .map(|row| Neighbor::new(row, self.cosine_distance(query.as_slice(), query_norm, row)))
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_unstable_by(rank);

        trace!(k, best = ?hits.first(), "scan complete");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.matrix.row_count()
    }

    fn dimension(&self) -> usize {
        self.matrix.dimension()
    }
}
