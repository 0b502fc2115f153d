use std::collections::HashMap;
use std::sync::Arc;

use super::embedding::l2_norm;
use crate::domain::{DomainError, Result};

/// Dense row-major N×D embedding matrix. Immutable once built.
#[derive(Debug, Clone)]
pub struct CatalogMatrix {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
    norms: Vec<f64>,
}

impl CatalogMatrix {
    /// Builds a matrix from row-major `data`.
    ///
    /// An empty matrix (`rows == 0`) is representable so the index can report it; loaders
    /// reject it before it reaches a running service.
    pub fn new(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
        if rows > 0 && dim == 0 {
            return Err(DomainError::load("catalog rows have zero dimensions"));
        }
        if data.len() != rows * dim {
            return Err(DomainError::load(format!(
                "catalog data holds {} values, expected {rows}x{dim}",
                data.len()
            )));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::load(format!(
                "non-finite value in catalog row {}",
                pos / dim.max(1)
            )));
        }

        let norms = if dim == 0 {
            Vec::new()
        } else {
            data.chunks_exact(dim).map(l2_norm).collect()
        };

        Ok(Self {
            data,
            rows,
            dim,
            norms,
        })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        let count = rows.len();
        let mut data = Vec::with_capacity(count * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(DomainError::load(format!(
                    "row {i} has {} columns, expected {dim}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::new(data, count, dim)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row `index` of the matrix.
    ///
    /// # Panics
    ///
    /// Panics when `index >= row_count()`. Callers only pass indices produced by a scan
    /// over this same matrix.
    pub fn vector_at(&self, index: usize) -> &[f32] {
        assert!(
            index < self.rows,
            "catalog row {index} out of range (rows = {})",
            self.rows
        );
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    pub(crate) fn norm_at(&self, index: usize) -> f64 {
        self.norms[index]
    }
}

/// Row index → opaque item reference (typically an image filename).
///
/// Rows without an entry are valid catalog members that can never be recommended.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMapping {
    entries: HashMap<usize, String>,
}

impl IdentifierMapping {
    pub fn new(entries: HashMap<usize, String>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, row: usize) -> Option<&str> {
        self.entries.get(&row).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_row(&self) -> Option<usize> {
        self.entries.keys().copied().max()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for IdentifierMapping {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

/// Loaded catalog: the matrix plus the mapping consulted for it.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub matrix: Arc<CatalogMatrix>,
    pub mapping: IdentifierMapping,
}

impl Catalog {
    /// Pairs a matrix with its mapping, checking that every mapped row exists.
    pub fn new(matrix: CatalogMatrix, mapping: IdentifierMapping) -> Result<Self> {
        if let Some(max_row) = mapping.max_row() {
            if max_row >= matrix.row_count() {
                return Err(DomainError::load(format!(
                    "mapping references row {max_row} but catalog has {} rows",
                    matrix.row_count()
                )));
            }
        }

        Ok(Self {
            matrix: Arc::new(matrix),
            mapping,
        })
    }

    pub fn row_count(&self) -> usize {
        self.matrix.row_count()
    }

    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }
}
