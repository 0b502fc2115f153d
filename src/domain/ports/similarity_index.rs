use crate::domain::{errors::DomainError, Embedding, Neighbor};

/// Nearest-neighbour search over a fixed catalog.
///
/// Results are sorted by ascending cosine distance, ties broken by ascending row index, and
/// hold `min(k, rows)` entries. An empty catalog is an error.
pub trait SimilarityIndex: Send + Sync {
    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>, DomainError>;
    fn len(&self) -> usize;
    fn dimension(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
