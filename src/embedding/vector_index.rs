/// Exact cosine-similarity index over chunk embeddings
use crate::chunking::DocumentChunk;
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// A vector paired with the chunk it was computed from
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

/// Search result with chunk and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub score: f32,
}

/// Read-only vector index
///
/// Rows are L2-normalized at build time so a search is a single matrix-vector product.
/// Ties keep insertion order.
#[derive(Debug)]
pub struct VectorIndex {
    vectors: Array2<f32>,
    chunks: Vec<DocumentChunk>,
    dimension: usize,
}

impl VectorIndex {
    /// Build the index from every entry at once
    pub fn build(dimension: usize, entries: Vec<IndexEntry>) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::InitializationError(
                "Vector dimension must be greater than 0".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(entries.len() * dimension);
        let mut chunks = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: entry.vector.len(),
                });
            }
            flat.extend(normalized(&entry.vector));
            chunks.push(entry.chunk);
        }

        let vectors = Array2::from_shape_vec((chunks.len(), dimension), flat)
            .map_err(|e| VectorIndexError::InitializationError(e.to_string()))?;

        Ok(Self {
            vectors,
            chunks,
            dimension,
        })
    }

    /// Search for the k most similar chunks, most similar first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = Array1::from(normalized(query));
        let scores = self.vectors.dot(&query);

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        // sort_by is stable, so equal scores stay in insertion order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(idx, score)| SearchResult {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector.to_vec()
    } else {
        vector.iter().map(|x| x / norm).collect()
    }
}
