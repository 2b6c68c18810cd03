//! HTTP handlers for the v1 API.

use std::time::Instant;

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LingoError, Result};
use crate::models::{RetrievedRecord, SearchRequest, SearchResponse, TranslationRecord};

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: ComponentStatus,
    pub embeddings: EmbeddingsStatus,
    pub ocr: ComponentStatus,
    pub translation: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingsStatus {
    pub status: String,
    pub model: String,
    pub dimensions: usize,
}

fn availability(available: bool) -> ComponentStatus {
    ComponentStatus {
        status: if available { "ok" } else { "unavailable" }.to_string(),
    }
}

/// `GET /api/v1/health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.sync().await {
        Ok(_) => availability(true),
        Err(_) => ComponentStatus {
            status: "error".to_string(),
        },
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        embeddings: EmbeddingsStatus {
            status: "ok".to_string(),
            model: state.config.embeddings.model.clone(),
            dimensions: state.config.embeddings.dimensions,
        },
        ocr: availability(state.ocr_available),
        translation: availability(state.translation_available),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TranslationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// `POST /api/v1/images`
///
/// Accepts a multipart form with a `file` field holding the image. The
/// content is sniffed; anything that is not an image is rejected before the
/// pipeline runs.
pub async fn process_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessImageResponse>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(String::from);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| LingoError::Validation(format!("Failed to read file: {e}")))?;
            file_bytes = Some(bytes.to_vec());
        }
    }

    let bytes = file_bytes
        .ok_or_else(|| LingoError::Validation("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(LingoError::Validation("Uploaded file is empty".to_string()));
    }

    let is_image = infer::get(&bytes)
        .is_some_and(|kind| kind.matcher_type() == infer::MatcherType::Image);
    if !is_image {
        return Err(LingoError::Validation(
            "Uploaded file is not a recognized image format".to_string(),
        ));
    }

    let name = file_name.unwrap_or_else(|| "upload".to_string());
    info!(image = %name, bytes = bytes.len(), "Processing uploaded image");

    let outcome = state.pipeline.run(bytes, name).await?;

    let processed_image_base64 = outcome
        .processed_image_bytes
        .as_deref()
        .map(|b| base64::engine::general_purpose::STANDARD.encode(b));

    Ok(Json(ProcessImageResponse {
        processed_image_url: outcome.processed_image_url,
        processed_image_base64,
        record: outcome.saved_record,
        status_message: outcome.status_message,
        error_detail: outcome.error_detail,
    }))
}

/// `POST /api/v1/search`
///
/// An empty or whitespace query is a legitimate request for nothing: the
/// retrieval service short-circuits it to an empty result list.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    let results = state.retrieval.search(&req.q, req.mode, req.limit).await?;

    Ok(Json(SearchResponse {
        total: results.len() as u32,
        results,
        timing_ms: start.elapsed().as_millis() as u64,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub records: Vec<RetrievedRecord>,
    pub total: u32,
}

/// `GET /api/v1/records`
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> Result<Json<ListRecordsResponse>> {
    let records = state.retrieval.list_recent(params.limit).await?;

    Ok(Json(ListRecordsResponse {
        total: records.len() as u32,
        records,
    }))
}

/// `GET /api/v1/records/{recordId}`
pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<TranslationRecord>> {
    let record = state
        .db
        .get_record_by_id(&record_id)
        .await?
        .ok_or_else(|| LingoError::NotFound(format!("Record '{record_id}' not found")))?;

    Ok(Json(record))
}
