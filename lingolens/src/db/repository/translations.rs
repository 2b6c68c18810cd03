use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{LingoError, Result};
use crate::models::{RetrievedRecord, TranslationRecord};

const PROJECTION: &str = "id, original_image_name, original_image_url, processed_image_url, \
                          original_text, translated_text, created_at";

pub struct TranslationRepository;

impl TranslationRepository {
    pub async fn upsert(conn: &Connection, record: &TranslationRecord) -> Result<()> {
        // vector32() does not accept NULL, so the embedding-less insert
        // needs its own statement.
        if let Some(ref embedding) = record.embedding {
            let embedding_json = serde_json::to_string(embedding)?;
            conn.execute(
                r#"
                INSERT INTO translations (
                    id, original_image_name, original_image_url, processed_image_url,
                    original_text, translated_text, embedding,
                    original_lang, translated_lang, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, vector32(?7), ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    original_image_name = excluded.original_image_name,
                    original_image_url = excluded.original_image_url,
                    processed_image_url = excluded.processed_image_url,
                    original_text = excluded.original_text,
                    translated_text = excluded.translated_text,
                    embedding = excluded.embedding,
                    original_lang = excluded.original_lang,
                    translated_lang = excluded.translated_lang,
                    created_at = excluded.created_at
                "#,
                params![
                    record.id.clone(),
                    record.original_image_name.clone(),
                    record.original_image_url.clone(),
                    record.processed_image_url.clone(),
                    record.original_text.clone(),
                    record.translated_text.clone(),
                    embedding_json,
                    record.original_lang.clone(),
                    record.translated_lang.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await?;
        } else {
            conn.execute(
                r#"
                INSERT INTO translations (
                    id, original_image_name, original_image_url, processed_image_url,
                    original_text, translated_text, embedding,
                    original_lang, translated_lang, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    original_image_name = excluded.original_image_name,
                    original_image_url = excluded.original_image_url,
                    processed_image_url = excluded.processed_image_url,
                    original_text = excluded.original_text,
                    translated_text = excluded.translated_text,
                    embedding = excluded.embedding,
                    original_lang = excluded.original_lang,
                    translated_lang = excluded.translated_lang,
                    created_at = excluded.created_at
                "#,
                params![
                    record.id.clone(),
                    record.original_image_name.clone(),
                    record.original_image_url.clone(),
                    record.processed_image_url.clone(),
                    record.original_text.clone(),
                    record.translated_text.clone(),
                    record.original_lang.clone(),
                    record.translated_lang.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await?;
        }

        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<TranslationRecord>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, original_image_name, original_image_url, processed_image_url,
                       original_text, translated_text, original_lang, translated_lang, created_at
                FROM translations WHERE id = ?1
                "#,
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_record(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<RetrievedRecord>> {
        let sql = format!(
            "SELECT {PROJECTION} FROM translations ORDER BY created_at DESC LIMIT ?1"
        );
        let mut rows = conn.query(&sql, params![limit]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_projection(&row, None)?);
        }
        Ok(results)
    }

    pub async fn search_by_vector(
        conn: &Connection,
        embedding: &[f32],
        limit: u32,
    ) -> Result<Vec<RetrievedRecord>> {
        let embedding_json = serde_json::to_string(embedding)?;

        // Distance-ordered, ascending: closest first. Rows without an
        // embedding never enter the candidate set.
        let sql = format!(
            r#"
            SELECT {PROJECTION},
                   vector_distance_cos(embedding, vector32(?1)) AS distance
            FROM translations
            WHERE embedding IS NOT NULL
            ORDER BY distance
            LIMIT ?2
            "#
        );

        let mut rows = conn.query(&sql, params![embedding_json, limit]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let distance = row.get::<f64>(7)? as f32;
            results.push(Self::row_to_projection(&row, Some(distance))?);
        }
        Ok(results)
    }

    pub async fn search_by_text(
        conn: &Connection,
        query: &str,
        limit: u32,
    ) -> Result<Vec<RetrievedRecord>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let sql = format!(
            r#"
            SELECT {PROJECTION}
            FROM translations
            WHERE LOWER(translated_text) LIKE ?1
            LIMIT ?2
            "#
        );

        let mut rows = conn.query(&sql, params![pattern, limit]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_projection(&row, None)?);
        }
        Ok(results)
    }

    fn parse_created_at(raw: String) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| LingoError::Internal(format!("Invalid created_at '{raw}': {e}")))
    }

    fn row_to_record(row: &libsql::Row) -> Result<TranslationRecord> {
        Ok(TranslationRecord {
            id: row.get(0)?,
            original_image_name: row.get(1)?,
            original_image_url: row.get(2)?,
            processed_image_url: row.get(3)?,
            original_text: row.get(4)?,
            translated_text: row.get(5)?,
            embedding: None,
            original_lang: row.get(6)?,
            translated_lang: row.get(7)?,
            created_at: Self::parse_created_at(row.get::<String>(8)?)?,
        })
    }

    fn row_to_projection(
        row: &libsql::Row,
        similarity_score: Option<f32>,
    ) -> Result<RetrievedRecord> {
        Ok(RetrievedRecord {
            id: row.get(0)?,
            original_image_name: row.get(1)?,
            original_image_url: row.get(2)?,
            processed_image_url: row.get(3)?,
            original_text: row.get(4)?,
            translated_text: row.get(5)?,
            created_at: Self::parse_created_at(row.get::<String>(6)?)?,
            similarity_score,
        })
    }
}
