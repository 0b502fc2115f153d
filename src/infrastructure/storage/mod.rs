mod uploads;

pub use uploads::{secure_filename, LocalUploadStore};
