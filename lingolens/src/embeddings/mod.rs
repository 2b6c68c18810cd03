//! Embedding generation for translated text and search queries.
//!
//! Follows the provider pattern used elsewhere in the crate: the [`Embedder`]
//! trait is the seam the pipeline and retrieval engine depend on, and
//! [`EmbeddingProvider`] is the fastembed-backed implementation.

mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub use provider::EmbeddingProvider;

/// Fixed-dimension text embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}
