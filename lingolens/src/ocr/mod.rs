//! Text extraction from image bytes.
//!
//! Provider pattern: [`TextExtractor`] is the seam the pipeline depends on,
//! [`OcrProvider`] routes to a concrete backend based on `OcrConfig::model`:
//! - `local/tesseract` (default) via leptess
//! - `azure/...` via an Image Analysis REST endpoint
//! - `openai/...` via a vision chat-completion endpoint
//!
//! All backends return typed errors. The pipeline, not this module, decides
//! that OCR failures degrade to "no text found".

mod api;
mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub use provider::OcrProvider;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String>;
}
