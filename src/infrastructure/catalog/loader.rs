use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

use super::npy;
use crate::domain::{Catalog, CatalogMatrix, DomainError, IdentifierMapping, Result};

/// Loads the catalog matrix and its identifier mapping, failing on any integrity problem.
#[instrument(skip_all, fields(matrix = %matrix_path.display(), mapping = %mapping_path.display()))]
pub fn load_catalog(matrix_path: &Path, mapping_path: &Path) -> Result<Catalog> {
    let matrix = load_matrix(matrix_path)?;
    if matrix.is_empty() {
        return Err(DomainError::load(format!(
            "catalog matrix {} has no rows",
            matrix_path.display()
        )));
    }

    let mapping = load_mapping(mapping_path)?;
    let catalog = Catalog::new(matrix, mapping)?;

    let unmapped = catalog.row_count() - catalog.mapping.len();
    if unmapped > 0 {
        warn!(unmapped, "catalog rows without an item reference will never be recommended");
    }
    info!(
        rows = catalog.row_count(),
        dim = catalog.dimension(),
        mapped = catalog.mapping.len(),
        "catalog loaded"
    );

    Ok(catalog)
}

/// Reads a dense matrix, choosing the format from the file extension.
pub fn load_matrix(path: &Path) -> Result<CatalogMatrix> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("npy") => {
            let bytes = read(path)?;
            let m = npy::parse(&bytes).map_err(|e| in_file(path, e))?;
            CatalogMatrix::new(m.data, m.rows, m.cols)
        }
        Some("txt") => {
            let text = String::from_utf8(read(path)?)
                .map_err(|_| DomainError::load(format!("{} is not UTF-8", path.display())))?;
            parse_text_matrix(&text).map_err(|e| in_file(path, e))
        }
        _ => Err(DomainError::load(format!(
            "unsupported matrix format for {}; use .npy or .txt",
            path.display()
        ))),
    }
}

/// Whitespace-separated rows, one per line. Blank lines and `#` comments are skipped.
pub fn parse_text_matrix(text: &str) -> Result<CatalogMatrix> {
    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|v| {
                v.parse::<f32>().map_err(|_| {
                    DomainError::load(format!("line {}: invalid number {v:?}", line_no + 1))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    CatalogMatrix::from_rows(rows)
}

pub fn load_mapping(path: &Path) -> Result<IdentifierMapping> {
    let bytes = read(path)?;
    parse_mapping(&bytes).map_err(|e| in_file(path, e))
}

/// Parses a JSON object of `"row": "item reference"` pairs.
pub fn parse_mapping(bytes: &[u8]) -> Result<IdentifierMapping> {
    let raw: HashMap<String, String> = serde_json::from_slice(bytes)
        .map_err(|e| DomainError::load(format!("invalid mapping JSON: {e}")))?;

    let mut entries = HashMap::with_capacity(raw.len());
    for (key, item_ref) in raw {
        let row = canonical_row(&key).ok_or_else(|| {
            DomainError::load(format!("mapping key {key:?} is not a row index"))
        })?;
        if item_ref.trim().is_empty() {
            return Err(DomainError::load(format!(
                "mapping entry {row} has an empty item reference"
            )));
        }
        entries.insert(row, item_ref);
    }

    Ok(IdentifierMapping::new(entries))
}

/// Plain decimal with no sign, padding or leading zeros, so each row has one spelling.
fn canonical_row(key: &str) -> Option<usize> {
    let row = key.parse::<usize>().ok()?;
    (row.to_string() == key).then_some(row)
}

fn in_file(path: &Path, err: DomainError) -> DomainError {
    match err {
        DomainError::Load(msg) => DomainError::load(format!("{}: {msg}", path.display())),
        other => other,
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| DomainError::load(format!("cannot read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::catalog::npy::tests::encode_f32;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_load_npy_catalog() {
        let dir = TempDir::new().unwrap();
        let matrix = write(
            &dir,
            "features.npy",
            &encode_f32(3, 2, &[1.0, 0.0, 0.0, 1.0, -1.0, 0.0]),
        );
        let mapping = write(&dir, "mapping.json", br#"{"0": "a.png", "2": "c.png"}"#);

        let catalog = load_catalog(&matrix, &mapping).unwrap();
        assert_eq!(catalog.row_count(), 3);
        assert_eq!(catalog.dimension(), 2);
        assert_eq!(catalog.matrix.vector_at(2), &[-1.0, 0.0]);
        assert_eq!(catalog.mapping.resolve(0), Some("a.png"));
        assert_eq!(catalog.mapping.resolve(1), None);
    }

    #[test]
    fn test_load_text_catalog() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "features.txt", b"# two rows\n1 0\n\n0.5 0.5  # inline\n");
        let mapping = write(&dir, "mapping.json", br#"{"0": "a.png", "1": "b.png"}"#);

        let catalog = load_catalog(&matrix, &mapping).unwrap();
        assert_eq!(catalog.row_count(), 2);
        assert_eq!(catalog.matrix.vector_at(1), &[0.5, 0.5]);
    }

    #[test]
    fn test_empty_matrix_is_load_error() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "features.npy", &encode_f32(0, 4, &[]));
        let mapping = write(&dir, "mapping.json", b"{}");

        let err = load_catalog(&matrix, &mapping).unwrap_err();
        assert!(matches!(err, DomainError::Load(_)));
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let mapping = write(&dir, "mapping.json", b"{}");
        let err = load_catalog(&dir.path().join("absent.npy"), &mapping).unwrap_err();
        assert!(matches!(err, DomainError::Load(_)));
    }

    #[test]
    fn test_mapping_row_out_of_range() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "features.npy", &encode_f32(2, 1, &[1.0, 2.0]));
        let mapping = write(&dir, "mapping.json", br#"{"0": "a.png", "2": "c.png"}"#);

        assert!(matches!(
            load_catalog(&matrix, &mapping),
            Err(DomainError::Load(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let matrix = write(&dir, "features.pkl", b"\x80\x04");
        assert!(load_matrix(&matrix).is_err());
    }

    #[test]
    fn test_ragged_text_matrix() {
        let err = parse_text_matrix("1 2 3\n4 5\n").unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_text_matrix_bad_number() {
        let err = parse_text_matrix("1 2\n3 x\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_mapping_rejects_non_integer_key() {
        assert!(parse_mapping(br#"{"first": "a.png"}"#).is_err());
        assert!(parse_mapping(br#"{"-1": "a.png"}"#).is_err());
    }

    #[test]
    fn test_mapping_rejects_empty_reference() {
        assert!(parse_mapping(br#"{"0": "  "}"#).is_err());
    }

    #[test]
    fn test_mapping_rejects_non_canonical_keys() {
        for key in [" 1", "+1", "01", "1 ", "1.0", "-1", ""] {
            let json = format!(r#"{{"0": "a.png", "{key}": "b.png"}}"#);
            let err = parse_mapping(json.as_bytes()).unwrap_err();
            assert!(matches!(err, DomainError::Load(_)), "{key:?}");
        }

        let mapping = parse_mapping(br#"{"0": "a.png", "10": "k.png"}"#).unwrap();
        assert_eq!(mapping.resolve(10), Some("k.png"));
    }

    #[test]
    fn test_mapping_rejects_non_object() {
        assert!(parse_mapping(b"[\"a.png\"]").is_err());
    }
}
