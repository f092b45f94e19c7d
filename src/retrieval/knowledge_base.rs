//! Corpus loading and one-shot index construction

use super::RetrievalError;
use crate::chunking::TextSplitter;
use crate::embedding::{EmbeddingError, EmbeddingProvider, IndexEntry, VectorIndex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Where the knowledge text comes from
#[derive(Debug, Clone)]
pub enum Corpus {
    File(PathBuf),
    Text { name: String, text: String },
}

impl Corpus {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            text: text.into(),
        }
    }

    async fn read(&self) -> Result<String, RetrievalError> {
        match self {
            Self::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                RetrievalError::Corpus {
                    path: path.clone(),
                    source,
                }
            }),
            Self::Text { text, .. } => Ok(text.clone()),
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Text { name, .. } => write!(f, "{}", name),
        }
    }
}

struct LoadedIndex {
    index: VectorIndex,
    corpus_digest: String,
}

/// Snapshot of the knowledge base for status reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseStats {
    pub initialized: bool,
    pub chunk_count: usize,
    /// Number of build attempts since construction
    pub builds: u64,
    pub embeddings_model: String,
    /// BLAKE3 digest of the corpus the index was built from
    pub corpus_digest: Option<String>,
}

/// Chunked, embedded corpus behind a single-initialization guard
///
/// The index is built on first use; concurrent first callers share one build.
/// A failed build leaves the guard empty so the next caller retries.
pub struct KnowledgeBase {
    corpus: Corpus,
    splitter: TextSplitter,
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    state: OnceCell<LoadedIndex>,
    builds: AtomicU64,
}

impl KnowledgeBase {
    pub fn new(
        corpus: Corpus,
        splitter: TextSplitter,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            corpus,
            splitter,
            provider,
            batch_size: batch_size.max(1),
            state: OnceCell::new(),
            builds: AtomicU64::new(0),
        }
    }

    /// Build the index unless it already exists
    pub async fn ensure_ready(&self) -> Result<&VectorIndex, RetrievalError> {
        let loaded = self.state.get_or_try_init(|| self.build()).await?;
        Ok(&loaded.index)
    }

    /// The built index, or `None` before the first successful build
    pub fn index(&self) -> Option<&VectorIndex> {
        self.state.get().map(|loaded| &loaded.index)
    }

    pub fn provider(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.provider)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        let loaded = self.state.get();
        KnowledgeBaseStats {
            initialized: loaded.is_some(),
            chunk_count: loaded.map_or(0, |l| l.index.len()),
            builds: self.builds.load(Ordering::SeqCst),
            embeddings_model: self.provider.model_name().to_string(),
            corpus_digest: loaded.map(|l| l.corpus_digest.clone()),
        }
    }

    /// Drop the built index so the next query rebuilds it
    pub fn reset(&mut self) {
        self.state.take();
        info!("Knowledge base reset");
    }

    async fn build(&self) -> Result<LoadedIndex, RetrievalError> {
        let attempt = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        let start = Instant::now();
        info!(attempt, "Building knowledge base from {}", self.corpus);

        let text = self.corpus.read().await?;
        let corpus_digest = blake3::hash(text.as_bytes()).to_hex().to_string();

        let mut documents = self
            .splitter
            .create_documents(&text, &self.corpus.to_string());
        let total = documents.len();
        documents.retain(|d| !d.text.trim().is_empty());
        if documents.len() < total {
            debug!("Skipped {} whitespace-only chunks", total - documents.len());
        }
        info!("Split into {} document chunks", documents.len());

        let mut entries = Vec::with_capacity(documents.len());
        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }

            entries.extend(
                vectors
                    .into_iter()
                    .zip(batch.iter().cloned())
                    .map(|(vector, chunk)| IndexEntry { vector, chunk }),
            );
        }

        let index = VectorIndex::build(self.provider.dimension(), entries)?;

        info!(
            "Knowledge base ready: {} chunks, {}ms",
            index.len(),
            start.elapsed().as_millis()
        );

        Ok(LoadedIndex {
            index,
            corpus_digest,
        })
    }
}
