use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RetrievedRecord, TranslationRecord};

/// Persistence and retrieval operations for translation records.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Insert-or-overwrite by `id`. A retry with the same id rewrites the
    /// stored document instead of duplicating it.
    async fn upsert_record(&self, record: &TranslationRecord) -> Result<()>;

    async fn get_record_by_id(&self, id: &str) -> Result<Option<TranslationRecord>>;

    /// Newest-first listing for the history view.
    async fn list_recent(&self, limit: u32) -> Result<Vec<RetrievedRecord>>;

    /// Top-`limit` records by ascending cosine distance to `embedding`.
    /// Records without a stored embedding are excluded, not ranked last.
    async fn search_by_vector(
        &self,
        embedding: &[f32],
        limit: u32,
    ) -> Result<Vec<RetrievedRecord>>;

    /// Case-insensitive containment match against the translated text,
    /// returned in store-native order with no similarity score.
    async fn search_by_text(&self, query: &str, limit: u32) -> Result<Vec<RetrievedRecord>>;
}

/// A complete database backend: record store plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: TranslationStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
