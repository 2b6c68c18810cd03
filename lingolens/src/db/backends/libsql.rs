use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::TranslationRepository;
use crate::db::traits::{DatabaseBackend, TranslationStore};
use crate::error::Result;
use crate::models::{RetrievedRecord, TranslationRecord};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TranslationStore for LibSqlBackend {
    async fn upsert_record(&self, record: &TranslationRecord) -> Result<()> {
        let conn = self.db.connect()?;
        TranslationRepository::upsert(&conn, record).await
    }

    async fn get_record_by_id(&self, id: &str) -> Result<Option<TranslationRecord>> {
        let conn = self.db.connect()?;
        TranslationRepository::get_by_id(&conn, id).await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<RetrievedRecord>> {
        let conn = self.db.connect()?;
        TranslationRepository::list_recent(&conn, limit).await
    }

    async fn search_by_vector(
        &self,
        embedding: &[f32],
        limit: u32,
    ) -> Result<Vec<RetrievedRecord>> {
        let conn = self.db.connect()?;
        TranslationRepository::search_by_vector(&conn, embedding, limit).await
    }

    async fn search_by_text(&self, query: &str, limit: u32) -> Result<Vec<RetrievedRecord>> {
        let conn = self.db.connect()?;
        TranslationRepository::search_by_text(&conn, query, limit).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
