//! Search over persisted translation records.
//!
//! Three modes: vector (embed the query, rank by ascending cosine distance),
//! full-text (case-insensitive containment on the translated text), and
//! hybrid (vector first, then full-text, merged with id-dedup).

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::models::{RetrievedRecord, SearchMode};

#[derive(Clone)]
pub struct RetrievalService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: Arc<dyn Embedder>,
    default_limit: u32,
    max_limit: u32,
}

impl RetrievalService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: Option<u32>,
    ) -> Result<Vec<RetrievedRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);

        match mode {
            SearchMode::Vector => self.vector_search(query, limit).await,
            SearchMode::Fulltext => self.db.search_by_text(query, limit).await,
            SearchMode::Hybrid => Ok(self.hybrid_search(query, limit).await),
        }
    }

    pub async fn list_recent(&self, limit: Option<u32>) -> Result<Vec<RetrievedRecord>> {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);
        self.db.list_recent(limit).await
    }

    async fn vector_search(&self, query: &str, limit: u32) -> Result<Vec<RetrievedRecord>> {
        let embedding = self.embeddings.embed_query(query).await?;
        self.db.search_by_vector(&embedding, limit).await
    }

    /// Vector results first, then full-text, deduplicated by id with the
    /// earlier (semantically closer) hit winning. Either arm failing is
    /// logged and treated as an empty contribution; both failing yields an
    /// empty result, not an error.
    async fn hybrid_search(&self, query: &str, limit: u32) -> Vec<RetrievedRecord> {
        let vector_hits = match self.vector_search(query, limit).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Vector arm of hybrid search failed");
                Vec::new()
            }
        };

        let text_hits = match self.db.search_by_text(query, limit).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Full-text arm of hybrid search failed");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let merged: Vec<RetrievedRecord> = vector_hits
            .into_iter()
            .chain(text_hits)
            .filter(|record| seen.insert(record.id.clone()))
            .take(limit as usize)
            .collect();

        debug!(total = merged.len(), "Hybrid search merged");
        merged
    }
}
