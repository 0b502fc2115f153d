use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::UploadValidator;
use crate::domain::{
    ports::{ImageEmbedder, SimilarityIndex, UploadStore},
    DomainError, Embedding, IdentifierMapping, Neighbor, Recommendation, RecommendationFailure,
    RecommendationSet, RequestStage, Upload,
};

pub const DEFAULT_K: usize = 6;
pub const DEFAULT_MAX_K: usize = 100;

/// Orchestrates one recommendation request: validate, embed, normalize, search, resolve.
///
/// Holds only read-only shared state, so a single instance serves concurrent requests.
pub struct RecommendationService {
    embedder: Arc<dyn ImageEmbedder>,
    index: Arc<dyn SimilarityIndex>,
    mapping: Arc<IdentifierMapping>,
    uploads: Option<Arc<dyn UploadStore>>,
    validator: UploadValidator,
    default_k: usize,
    max_k: usize,
    strict_mapping: bool,
}

impl RecommendationService {
    /// Wires the pipeline, refusing an empty index or an embedder whose output dimension
    /// does not match the catalog.
    pub fn new(
        embedder: Arc<dyn ImageEmbedder>,
        index: Arc<dyn SimilarityIndex>,
        mapping: Arc<IdentifierMapping>,
    ) -> Result<Self, DomainError> {
        if index.is_empty() {
            return Err(DomainError::index("catalog is empty"));
        }
        if embedder.dimension() != index.dimension() {
            return Err(DomainError::load(format!(
                "embedder produces {}-d vectors but catalog rows are {}-d",
                embedder.dimension(),
                index.dimension()
            )));
        }

        Ok(Self {
            embedder,
            index,
            mapping,
            uploads: None,
            validator: UploadValidator::default(),
            default_k: DEFAULT_K,
            max_k: DEFAULT_MAX_K,
            strict_mapping: false,
        })
    }

    /// `default_k` applies when a request names no `k`; requests above `max_k` are refused.
    pub fn with_k_limits(mut self, default_k: usize, max_k: usize) -> Self {
        self.default_k = default_k;
        self.max_k = max_k;
        self
    }

    pub fn with_upload_store(mut self, store: Arc<dyn UploadStore>) -> Self {
        self.uploads = Some(store);
        self
    }

    pub fn with_validator(mut self, validator: UploadValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_strict_mapping(mut self, strict: bool) -> Self {
        self.strict_mapping = strict;
        self
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn catalog_rows(&self) -> usize {
        self.index.len()
    }

    pub fn catalog_dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Runs the full pipeline for an uploaded image.
    ///
    /// Every failure is reported with the last stage the request completed; nothing here
    /// panics on bad input.
    #[instrument(skip(self, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
    pub async fn recommend(
        &self,
        upload: Upload,
        k: Option<usize>,
    ) -> Result<RecommendationSet, RecommendationFailure> {
        let mut stage = RequestStage::Received;
        let fail = |stage: RequestStage| {
            move |error: DomainError| {
                warn!(stage = stage.as_str(), error = %error, "recommendation failed");
                RecommendationFailure::new(stage, error)
            }
        };

        let k = self.resolve_k(k).map_err(fail(stage))?;
        self.validator.validate(&upload).map_err(fail(stage))?;
        stage = self.advance(stage, RequestStage::Validated);

        let uploaded_image_ref = match &self.uploads {
            Some(store) => Some(
                store
                    .save(&upload.filename, &upload.bytes)
                    .await
                    .map_err(fail(stage))?,
            ),
            None => None,
        };

        let raw = self
            .embedder
            .embed(&upload.bytes)
            .await
            .map_err(fail(stage))?;
        stage = self.advance(stage, RequestStage::Embedded);

        let query = raw.normalized().map_err(fail(stage))?;
        stage = self.advance(stage, RequestStage::Normalized);

        let index = self.index.clone();
        let neighbors = tokio::task::spawn_blocking(move || index.nearest(&query, k))
            .await
            .map_err(|e| DomainError::internal(format!("search task failed: {e}")))
            .and_then(|r| r)
            .map_err(fail(stage))?;
        stage = self.advance(stage, RequestStage::Searched);

        let recommendations = self.resolve(&neighbors).map_err(fail(stage))?;
        stage = self.advance(stage, RequestStage::Resolved);

        self.advance(stage, RequestStage::Completed);
        info!(
            k,
            found = neighbors.len(),
            returned = recommendations.len(),
            "recommendation completed"
        );

        Ok(RecommendationSet {
            uploaded_image_ref,
            recommendations,
        })
    }

    /// Core path for an already-computed embedding: normalize, search, resolve.
    pub fn recommend_for_vector(
        &self,
        raw: &Embedding,
        k: usize,
    ) -> Result<Vec<Recommendation>, DomainError> {
        let query = raw.normalized()?;
        let neighbors = self.index.nearest(&query, k)?;
        self.resolve(&neighbors)
    }

    /// Maps neighbours to catalog items in rank order, dropping rows with no mapping
    /// (or failing on them in strict mode).
    pub fn resolve(&self, neighbors: &[Neighbor]) -> Result<Vec<Recommendation>, DomainError> {
        let mut out = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            match self.mapping.resolve(n.index) {
                Some(item_ref) => out.push(Recommendation {
                    index: n.index,
                    item_ref: item_ref.to_string(),
                    similarity: n.similarity(),
                }),
                None if self.strict_mapping => return Err(DomainError::UnmappedRow(n.index)),
                None => debug!(row = n.index, "dropping unmapped row"),
            }
        }
        Ok(out)
    }

    fn resolve_k(&self, k: Option<usize>) -> Result<usize, DomainError> {
        let k = k.unwrap_or(self.default_k);
        if k == 0 || k > self.max_k {
            return Err(DomainError::validation(format!(
                "k must be between 1 and {}, got {k}",
                self.max_k
            )));
        }
        Ok(k)
    }

    fn advance(&self, from: RequestStage, to: RequestStage) -> RequestStage {
        debug!(from = from.as_str(), to = to.as_str(), "stage transition");
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogMatrix, ErrorKind};
    use crate::infrastructure::index::BruteForceIndex;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed vector for any image.
    struct StubEmbedder(Vec<f32>);

    #[async_trait]
    impl ImageEmbedder for StubEmbedder {
        async fn embed(&self, _image: &[u8]) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(self.0.clone()))
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl ImageEmbedder for FailingEmbedder {
        async fn embed(&self, _image: &[u8]) -> Result<Embedding, DomainError> {
            Err(DomainError::malformed_image("cannot decode"))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[derive(Default)]
    struct MemoryUploads(Mutex<Vec<String>>);

    #[async_trait]
    impl UploadStore for MemoryUploads {
        async fn save(&self, filename: &str, _bytes: &[u8]) -> Result<String, DomainError> {
            self.0.lock().unwrap().push(filename.to_string());
            Ok(format!("stored-{filename}"))
        }
    }

    fn unit_square_index() -> Arc<dyn SimilarityIndex> {
        let matrix = CatalogMatrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ])
        .unwrap();
        Arc::new(BruteForceIndex::new(Arc::new(matrix)))
    }

    fn full_mapping() -> Arc<IdentifierMapping> {
        Arc::new(
            [(0, "a.png"), (1, "b.png"), (2, "c.png"), (3, "d.png")]
                .into_iter()
                .collect(),
        )
    }

    fn service(query: Vec<f32>) -> RecommendationService {
        RecommendationService::new(
            Arc::new(StubEmbedder(query)),
            unit_square_index(),
            full_mapping(),
        )
        .unwrap()
    }

    fn png_upload() -> Upload {
        Upload::new("query.png", vec![0x89, b'P', b'N', b'G'])
    }

    #[tokio::test]
    async fn test_end_to_end_unit_square() {
        let set = service(vec![0.9, 0.1])
            .recommend(png_upload(), None)
            .await
            .unwrap();

        let refs: Vec<&str> = set
            .recommendations
            .iter()
            .map(|r| r.item_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["a.png", "b.png", "d.png", "c.png"]);
        assert_eq!(set.recommendations[0].index, 0);
        assert!(set.recommendations[0].similarity > 0.99);
        assert!(set
            .recommendations
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
        assert!(set.uploaded_image_ref.is_none());
    }

    #[tokio::test]
    async fn test_unmapped_nearest_row_is_dropped() {
        let matrix =
            CatalogMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]])
                .unwrap();
        let mapping: IdentifierMapping = [(0, "a.png"), (2, "c.png")].into_iter().collect();
        let svc = RecommendationService::new(
            Arc::new(StubEmbedder(vec![0.0, 1.0])),
            Arc::new(BruteForceIndex::new(Arc::new(matrix))),
            Arc::new(mapping),
        )
        .unwrap();

        let set = svc.recommend(png_upload(), None).await.unwrap();
        let rows: Vec<usize> = set.recommendations.iter().map(|r| r.index).collect();
        assert_eq!(rows, vec![2, 0]);
    }

    #[tokio::test]
    async fn test_strict_mapping_fails_at_resolution() {
        let mapping: IdentifierMapping = [(0, "a.png")].into_iter().collect();
        let svc = RecommendationService::new(
            Arc::new(StubEmbedder(vec![0.0, 1.0])),
            unit_square_index(),
            Arc::new(mapping),
        )
        .unwrap()
        .with_strict_mapping(true);

        let failure = svc.recommend(png_upload(), Some(2)).await.unwrap_err();
        assert_eq!(failure.stage, RequestStage::Searched);
        assert!(matches!(failure.error, DomainError::UnmappedRow(1)));
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let set = service(vec![0.9, 0.1])
            .recommend(png_upload(), Some(2))
            .await
            .unwrap();
        assert_eq!(set.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_k_is_validation_failure() {
        let svc = service(vec![1.0, 0.0]);
        for k in [0, 101] {
            let failure = svc.recommend(png_upload(), Some(k)).await.unwrap_err();
            assert_eq!(failure.stage, RequestStage::Received);
            assert_eq!(failure.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_custom_k_limits() {
        let svc = service(vec![0.9, 0.1]).with_k_limits(1, 3);
        assert_eq!(svc.default_k(), 1);

        let set = svc.recommend(png_upload(), None).await.unwrap();
        assert_eq!(set.recommendations.len(), 1);

        let failure = svc.recommend(png_upload(), Some(4)).await.unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_disallowed_content_type_fails_before_embedding() {
        let upload = Upload::new("query.png", vec![1, 2, 3]).with_content_type("text/html");
        let failure = service(vec![1.0, 0.0])
            .recommend(upload, None)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, RequestStage::Received);
        assert_eq!(failure.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_disallowed_extension_fails_before_embedding() {
        let failure = service(vec![1.0, 0.0])
            .recommend(Upload::new("query.gif", vec![1, 2, 3]), None)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, RequestStage::Received);
        assert!(failure.error.is_client_fault());
    }

    #[tokio::test]
    async fn test_embedding_failure_reports_validated_stage() {
        let svc = RecommendationService::new(
            Arc::new(FailingEmbedder),
            unit_square_index(),
            full_mapping(),
        )
        .unwrap();

        let failure = svc.recommend(png_upload(), None).await.unwrap_err();
        assert_eq!(failure.stage, RequestStage::Validated);
        assert_eq!(failure.kind(), ErrorKind::Embedding);
    }

    #[tokio::test]
    async fn test_zero_embedding_is_normalization_failure() {
        let failure = service(vec![0.0, 0.0])
            .recommend(png_upload(), None)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, RequestStage::Embedded);
        assert_eq!(failure.kind(), ErrorKind::Normalization);
    }

    #[tokio::test]
    async fn test_upload_is_stored_and_referenced() {
        let store = Arc::new(MemoryUploads::default());
        let svc = service(vec![1.0, 0.0]).with_upload_store(store.clone());

        let set = svc.recommend(png_upload(), None).await.unwrap();
        assert_eq!(set.uploaded_image_ref.as_deref(), Some("stored-query.png"));
        assert_eq!(store.0.lock().unwrap().as_slice(), ["query.png"]);
    }

    #[test]
    fn test_recommend_for_vector_matches_own_row() {
        let svc = service(vec![1.0, 0.0]);
        let recs = svc
            .recommend_for_vector(&Embedding::new(vec![0.0, -3.0]), 1)
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_ref, "d.png");
        assert!((recs[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_rejected_at_construction() {
        let err = RecommendationService::new(
            Arc::new(StubEmbedder(vec![1.0, 0.0, 0.0])),
            unit_square_index(),
            full_mapping(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DomainError::Load(_)));
    }

    #[test]
    fn test_empty_catalog_rejected_at_construction() {
        let empty = CatalogMatrix::new(Vec::new(), 0, 2).unwrap();
        let err = RecommendationService::new(
            Arc::new(StubEmbedder(vec![1.0, 0.0])),
            Arc::new(BruteForceIndex::new(Arc::new(empty))),
            full_mapping(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DomainError::Index(_)));
    }
}
