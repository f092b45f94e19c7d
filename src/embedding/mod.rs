//! Embedding generation and vector search
//!
//! - `EmbeddingProvider` trait for abstraction over backends
//! - `FastEmbedProvider` for local embedding (all-MiniLM-L6-v2, 384-dim)
//! - `OpenAiEmbeddingProvider` for OpenAI-compatible hosted embeddings
//! - `VectorIndex` for exact cosine similarity search

mod provider;
mod vector_index;

pub use provider::{
    EmbeddingError, EmbeddingProvider, FastEmbedProvider, OpenAiEmbeddingProvider,
};
pub use vector_index::{IndexEntry, SearchResult, VectorIndex, VectorIndexError};

use crate::config::{parse_duration, EmbeddingConfig};
use std::sync::Arc;

/// Create the provider selected by `embedding.provider`
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let timeout = parse_duration(&config.timeout)
        .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

    match config.provider.as_str() {
        "local" => Ok(Arc::new(FastEmbedProvider::new(
            &config.model,
            config.batch_size,
            timeout,
        )?)),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                EmbeddingError::InitializationError(format!(
                    "Environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(OpenAiEmbeddingProvider::new(
                &config.base_url,
                api_key,
                &config.model,
                config.dimension,
                timeout,
            )?))
        }
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
