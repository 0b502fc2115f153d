mod loader;
pub mod npy;

pub use loader::{load_catalog, load_mapping, load_matrix, parse_mapping, parse_text_matrix};
