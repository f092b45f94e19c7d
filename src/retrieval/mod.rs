//! Knowledge base construction and top-k retrieval

mod knowledge_base;

pub use knowledge_base::{Corpus, KnowledgeBase, KnowledgeBaseStats};

use crate::embedding::{EmbeddingError, EmbeddingProvider, SearchResult, VectorIndexError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Number of chunks retrieved per question unless configured otherwise
pub const DEFAULT_TOP_K: usize = 4;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Vector index is not initialized")]
    IndexNotReady,

    #[error("Failed to read corpus {path:?}: {source}")]
    Corpus {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] VectorIndexError),
}

/// Embeds a query and returns the most similar chunks from a built knowledge base
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self { provider, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Search without building: an unbuilt knowledge base is an error, not a trigger
    pub async fn retrieve(
        &self,
        knowledge: &KnowledgeBase,
        query: &str,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let index = knowledge.index().ok_or(RetrievalError::IndexNotReady)?;

        let vector = self.provider.embed(query).await?;
        let results = index.search(&vector, self.top_k)?;

        tracing::debug!(
            top_score = ?results.first().map(|r| r.score),
            "Retrieved {} of {} chunks",
            results.len(),
            index.len()
        );
        Ok(results)
    }
}
