use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection, embedding_dims: usize) -> Result<()> {
    let ddl = format!(
        r#"
        -- Translation records, one per successful pipeline run
        CREATE TABLE IF NOT EXISTS translations (
            id TEXT PRIMARY KEY,
            original_image_name TEXT NOT NULL,
            original_image_url TEXT NOT NULL,
            processed_image_url TEXT,
            original_text TEXT NOT NULL DEFAULT '',
            translated_text TEXT NOT NULL DEFAULT '',
            embedding F32_BLOB({embedding_dims}),
            original_lang TEXT NOT NULL,
            translated_lang TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_translations_created_at ON translations(created_at);
        "#
    );

    conn.execute_batch(&ddl).await?;

    create_vector_indexes(conn).await?;

    Ok(())
}

async fn create_vector_indexes(conn: &Connection) -> Result<()> {
    let index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='translations_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS translations_embedding_idx ON translations(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for translations (may already exist): {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test]
    async fn test_schema_initializes_on_fresh_database() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 384).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='translations'",
                (),
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 384).await.unwrap();
        init_schema(&conn, 384).await.unwrap();
    }
}
