//! The three-stage image processing pipeline: OCR, translate, overlay+persist.
//!
//! One invocation processes one image to completion; the stages are strictly
//! sequential and thread a [`ProcessingContext`] forward. Provider failures
//! in OCR, translation, and embedding degrade to empty/None and the run
//! continues; overlay failures abort; persistence failures surface as a
//! partial result that still carries the rendered image.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DatabaseBackend;
use crate::embeddings::Embedder;
use crate::error::{LingoError, Result};
use crate::models::TranslationRecord;
use crate::ocr::TextExtractor;
use crate::overlay::OverlayRender;
use crate::storage::ObjectStore;
use crate::translation::Translator;

/// Mutable record threaded through the stages. Fields fill in incrementally;
/// `image_bytes` and `image_name` are set once and never touched again.
#[derive(Debug, Default)]
pub struct ProcessingContext {
    pub image_bytes: Vec<u8>,
    pub image_name: String,
    pub extracted_text: String,
    pub translated_text: String,
    pub processed_image_bytes: Option<Vec<u8>>,
    pub original_image_url: Option<String>,
    pub processed_image_url: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl ProcessingContext {
    pub fn new(image_bytes: Vec<u8>, image_name: String) -> Self {
        Self {
            image_bytes,
            image_name,
            ..Default::default()
        }
    }
}

/// Terminal result of one pipeline run. Exactly one of `status_message`
/// (success, including the no-text skip) or `error_detail` (persistence
/// failure) is set.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub processed_image_bytes: Option<Vec<u8>>,
    pub processed_image_url: Option<String>,
    pub saved_record: Option<TranslationRecord>,
    pub status_message: Option<String>,
    pub error_detail: Option<String>,
}

impl PipelineOutcome {
    fn skipped() -> Self {
        Self {
            processed_image_bytes: None,
            processed_image_url: None,
            saved_record: None,
            status_message: Some(
                "No text detected; overlay and persistence were skipped.".to_string(),
            ),
            error_detail: None,
        }
    }

    fn completed(ctx: ProcessingContext, record: TranslationRecord) -> Self {
        Self {
            processed_image_bytes: ctx.processed_image_bytes,
            processed_image_url: ctx.processed_image_url,
            saved_record: Some(record),
            status_message: Some("Processing completed successfully.".to_string()),
            error_detail: None,
        }
    }

    fn persist_error(ctx: ProcessingContext, detail: String) -> Self {
        Self {
            processed_image_bytes: ctx.processed_image_bytes,
            processed_image_url: ctx.processed_image_url,
            saved_record: None,
            status_message: None,
            error_detail: Some(detail),
        }
    }
}

pub struct ImagePipeline {
    ocr: Arc<dyn TextExtractor>,
    translator: Arc<dyn Translator>,
    embeddings: Arc<dyn Embedder>,
    renderer: Arc<dyn OverlayRender>,
    object_store: Arc<dyn ObjectStore>,
    db: Arc<dyn DatabaseBackend>,
    from_lang: String,
    to_lang: String,
}

impl ImagePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ocr: Arc<dyn TextExtractor>,
        translator: Arc<dyn Translator>,
        embeddings: Arc<dyn Embedder>,
        renderer: Arc<dyn OverlayRender>,
        object_store: Arc<dyn ObjectStore>,
        db: Arc<dyn DatabaseBackend>,
        from_lang: String,
        to_lang: String,
    ) -> Self {
        Self {
            ocr,
            translator,
            embeddings,
            renderer,
            object_store,
            db,
            from_lang,
            to_lang,
        }
    }

    pub async fn run(&self, image_bytes: Vec<u8>, image_name: String) -> Result<PipelineOutcome> {
        let mut ctx = ProcessingContext::new(image_bytes, image_name);

        self.ocr_stage(&mut ctx).await;
        self.translate_stage(&mut ctx).await;
        self.finalize_stage(ctx).await
    }

    /// OCR never aborts the run: any provider failure degrades to "no text
    /// found", which downstream stages treat as a legitimate outcome.
    async fn ocr_stage(&self, ctx: &mut ProcessingContext) {
        ctx.extracted_text = match self.ocr.extract_text(&ctx.image_bytes).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OCR failed; continuing with no extracted text");
                String::new()
            }
        };
        info!(
            image = %ctx.image_name,
            chars = ctx.extracted_text.chars().count(),
            "OCR stage complete"
        );
    }

    async fn translate_stage(&self, ctx: &mut ProcessingContext) {
        if ctx.extracted_text.is_empty() {
            // Nothing extracted, so no provider call to pay for.
            ctx.translated_text = String::new();
            return;
        }

        ctx.translated_text = match self
            .translator
            .translate(&ctx.extracted_text, &self.from_lang, &self.to_lang)
            .await
        {
            Ok(text) => text,
            Err(LingoError::TranslationHttp { status, body }) => {
                warn!(status, body = %body, "Translation HTTP failure; continuing untranslated");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "Translation failed; continuing untranslated");
                String::new()
            }
        };
    }

    async fn finalize_stage(&self, mut ctx: ProcessingContext) -> Result<PipelineOutcome> {
        if ctx.extracted_text.is_empty() && ctx.translated_text.is_empty() {
            info!(image = %ctx.image_name, "No text found; skipping overlay and persistence");
            return Ok(PipelineOutcome::skipped());
        }

        // Prefer the translation for the overlay; fall back to the raw
        // extraction so an image is still produced when translation failed.
        let text_to_overlay = if ctx.translated_text.is_empty() {
            ctx.extracted_text.clone()
        } else {
            ctx.translated_text.clone()
        };
        ctx.processed_image_bytes = Some(self.renderer.render(&ctx.image_bytes, &text_to_overlay)?);

        let doc_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let safe_name = sanitize_object_name(&ctx.image_name);

        let original_url = self
            .object_store
            .upload(
                &ctx.image_bytes,
                &blob_name(&created_at, &doc_id, "original", &safe_name),
            )
            .await?;
        ctx.original_image_url = Some(original_url.clone());

        if let Some(ref processed) = ctx.processed_image_bytes {
            let url = self
                .object_store
                .upload(
                    processed,
                    &blob_name(&created_at, &doc_id, "processed", &safe_name),
                )
                .await?;
            ctx.processed_image_url = Some(url);
        }

        // Embedding is an enhancement: failure is logged and persistence
        // proceeds with a null vector.
        if !ctx.translated_text.is_empty() {
            ctx.embedding = match self.embeddings.embed_query(&ctx.translated_text).await {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!(error = %e, "Embedding generation failed; persisting without vector");
                    None
                }
            };
        }

        let record = TranslationRecord {
            id: doc_id.clone(),
            original_image_name: ctx.image_name.clone(),
            original_image_url: original_url,
            processed_image_url: ctx.processed_image_url.clone(),
            original_text: ctx.extracted_text.clone(),
            translated_text: ctx.translated_text.clone(),
            embedding: ctx.embedding.clone(),
            original_lang: self.from_lang.clone(),
            translated_lang: self.to_lang.clone(),
            created_at,
        };

        match self.db.upsert_record(&record).await {
            Ok(()) => {
                info!(id = %doc_id, "Translation record persisted");
                Ok(PipelineOutcome::completed(ctx, record))
            }
            Err(e) => {
                warn!(id = %doc_id, error = %e, "Persistence failed; returning partial result");
                let detail = format!("Failed to save record '{doc_id}': {e}");
                Ok(PipelineOutcome::persist_error(ctx, detail))
            }
        }
    }
}

/// Replace every character that is not alphanumeric, `.`, or `-` with `_`
/// so the original filename is safe inside an object name.
fn sanitize_object_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn blob_name(created_at: &DateTime<Utc>, id: &str, kind: &str, safe_name: &str) -> String {
    format!("{}_{id}_{kind}_{safe_name}", created_at.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::models::RetrievedRecord;

    struct StubOcr {
        result: std::result::Result<String, String>,
    }

    #[async_trait]
    impl TextExtractor for StubOcr {
        async fn extract_text(&self, _image_bytes: &[u8]) -> Result<String> {
            match &self.result {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(LingoError::Ocr(msg.clone())),
            }
        }
    }

    struct StubTranslator {
        result: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl StubTranslator {
        fn ok(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                result: Err(msg.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn translate(&self, _text: &str, _from: &str, _to: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(LingoError::TranslationHttp {
                    status: 500,
                    body: msg.clone(),
                }),
            }
        }
    }

    struct StubEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                Err(LingoError::Embedding("model offline".to_string()))
            } else {
                Ok(vec![0.1, 0.2, 0.3, 0.4])
            }
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    struct RecordingRenderer {
        last_text: Mutex<Option<String>>,
    }

    impl RecordingRenderer {
        fn new() -> Self {
            Self {
                last_text: Mutex::new(None),
            }
        }
    }

    impl OverlayRender for RecordingRenderer {
        fn render(&self, _image_bytes: &[u8], text: &str) -> Result<Vec<u8>> {
            *self.last_text.lock().unwrap() = Some(text.to_string());
            Ok(vec![9, 9, 9])
        }
    }

    struct RecordingStore {
        names: Mutex<Vec<String>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                names: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn upload(&self, _bytes: &[u8], object_name: &str) -> Result<String> {
            self.names.lock().unwrap().push(object_name.to_string());
            Ok(format!("http://test/{object_name}"))
        }
    }

    struct RecordingDb {
        records: Mutex<Vec<TranslationRecord>>,
        fail_upsert: bool,
    }

    impl RecordingDb {
        fn new(fail_upsert: bool) -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                fail_upsert,
            }
        }
    }

    #[async_trait]
    impl crate::db::TranslationStore for RecordingDb {
        async fn upsert_record(&self, record: &TranslationRecord) -> Result<()> {
            if self.fail_upsert {
                return Err(LingoError::Internal("store offline".to_string()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get_record_by_id(&self, _id: &str) -> Result<Option<TranslationRecord>> {
            Ok(None)
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<RetrievedRecord>> {
            Ok(Vec::new())
        }

        async fn search_by_vector(
            &self,
            _embedding: &[f32],
            _limit: u32,
        ) -> Result<Vec<RetrievedRecord>> {
            Ok(Vec::new())
        }

        async fn search_by_text(&self, _query: &str, _limit: u32) -> Result<Vec<RetrievedRecord>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl DatabaseBackend for RecordingDb {
        async fn sync(&self) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        translator: Arc<StubTranslator>,
        renderer: Arc<RecordingRenderer>,
        store: Arc<RecordingStore>,
        db: Arc<RecordingDb>,
        pipeline: ImagePipeline,
    }

    fn harness(
        ocr: StubOcr,
        translator: StubTranslator,
        embedder_fails: bool,
        db_fails: bool,
    ) -> Harness {
        let translator = Arc::new(translator);
        let renderer = Arc::new(RecordingRenderer::new());
        let store = Arc::new(RecordingStore::new());
        let db = Arc::new(RecordingDb::new(db_fails));

        let pipeline = ImagePipeline::new(
            Arc::new(ocr),
            translator.clone(),
            Arc::new(StubEmbedder {
                fail: embedder_fails,
            }),
            renderer.clone(),
            store.clone(),
            db.clone(),
            "en".to_string(),
            "ja".to_string(),
        );

        Harness {
            translator,
            renderer,
            store,
            db,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_empty_ocr_skips_translation_and_everything_downstream() {
        let h = harness(
            StubOcr {
                result: Ok(String::new()),
            },
            StubTranslator::ok("unused"),
            false,
            false,
        );

        let outcome = h.pipeline.run(vec![1, 2, 3], "blank.png".to_string()).await.unwrap();

        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
        assert!(h.renderer.last_text.lock().unwrap().is_none());
        assert!(outcome.processed_image_bytes.is_none());
        assert!(outcome.processed_image_url.is_none());
        assert!(outcome.saved_record.is_none());
        assert!(outcome.status_message.is_some());
        assert!(outcome.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_ocr_failure_degrades_to_skip_outcome() {
        let h = harness(
            StubOcr {
                result: Err("provider exploded".to_string()),
            },
            StubTranslator::ok("unused"),
            false,
            false,
        );

        let outcome = h.pipeline.run(vec![1], "x.png".to_string()).await.unwrap();

        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
        assert!(outcome.saved_record.is_none());
        assert!(outcome.status_message.is_some());
    }

    #[tokio::test]
    async fn test_failed_translation_overlays_extracted_text_instead() {
        let h = harness(
            StubOcr {
                result: Ok("HELLO".to_string()),
            },
            StubTranslator::failing("gateway down"),
            false,
            false,
        );

        let outcome = h.pipeline.run(vec![1], "sign.png".to_string()).await.unwrap();

        assert_eq!(
            h.renderer.last_text.lock().unwrap().as_deref(),
            Some("HELLO")
        );
        let record = outcome.saved_record.unwrap();
        assert_eq!(record.original_text, "HELLO");
        assert_eq!(record.translated_text, "");
        // No translation means no embedding input either.
        assert!(record.embedding.is_none());
    }

    #[tokio::test]
    async fn test_happy_path_persists_full_record() {
        let h = harness(
            StubOcr {
                result: Ok("HELLO".to_string()),
            },
            StubTranslator::ok("こんにちは"),
            false,
            false,
        );

        let outcome = h.pipeline.run(vec![1], "sign.png".to_string()).await.unwrap();

        assert_eq!(
            h.renderer.last_text.lock().unwrap().as_deref(),
            Some("こんにちは")
        );
        assert!(outcome.processed_image_url.is_some());
        assert!(outcome.status_message.is_some());
        assert!(outcome.error_detail.is_none());

        let record = outcome.saved_record.unwrap();
        assert_eq!(record.original_text, "HELLO");
        assert_eq!(record.translated_text, "こんにちは");
        assert_eq!(record.original_lang, "en");
        assert_eq!(record.translated_lang, "ja");
        assert!(record.processed_image_url.is_some());
        assert_eq!(record.embedding, Some(vec![0.1, 0.2, 0.3, 0.4]));

        // Both blobs were uploaded with the shared stamp and role markers.
        let names = h.store.names.lock().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].contains("_original_sign.png"));
        assert!(names[1].contains("_processed_sign.png"));
        assert_eq!(h.db.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_two_runs_generate_distinct_ids() {
        let h = harness(
            StubOcr {
                result: Ok("HELLO".to_string()),
            },
            StubTranslator::ok("こんにちは"),
            false,
            false,
        );

        let first = h.pipeline.run(vec![1], "a.png".to_string()).await.unwrap();
        let second = h.pipeline.run(vec![1], "a.png".to_string()).await.unwrap();

        assert_ne!(
            first.saved_record.unwrap().id,
            second.saved_record.unwrap().id
        );
    }

    #[tokio::test]
    async fn test_persist_failure_yields_partial_result() {
        let h = harness(
            StubOcr {
                result: Ok("HELLO".to_string()),
            },
            StubTranslator::ok("こんにちは"),
            false,
            true,
        );

        let outcome = h.pipeline.run(vec![1], "sign.png".to_string()).await.unwrap();

        assert!(outcome.processed_image_bytes.is_some());
        assert!(outcome.processed_image_url.is_some());
        assert!(outcome.saved_record.is_none());
        assert!(outcome.status_message.is_none());
        assert!(outcome.error_detail.is_some());
    }

    #[tokio::test]
    async fn test_embedding_failure_persists_with_null_vector() {
        let h = harness(
            StubOcr {
                result: Ok("HELLO".to_string()),
            },
            StubTranslator::ok("こんにちは"),
            true,
            false,
        );

        let outcome = h.pipeline.run(vec![1], "sign.png".to_string()).await.unwrap();

        let record = outcome.saved_record.unwrap();
        assert!(record.embedding.is_none());
        assert_eq!(record.translated_text, "こんにちは");
    }

    #[test]
    fn test_sanitize_object_name_replaces_unsafe_characters() {
        assert_eq!(
            sanitize_object_name("my photo (1).png"),
            "my_photo__1_.png"
        );
        assert_eq!(sanitize_object_name("clean-name.jpg"), "clean-name.jpg");
    }
}
