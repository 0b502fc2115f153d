mod embedding;
mod similarity_index;
mod upload_store;

pub use embedding::ImageEmbedder;
pub use similarity_index::SimilarityIndex;
pub use upload_store::UploadStore;
