//! Text translation via a Translator-v3-style REST endpoint.
//!
//! [`Translator`] is the pipeline's seam; [`TranslationProvider`] routes to
//! the configured REST backend or degrades to an unavailable state when
//! credentials are missing. Empty input is short-circuited to empty output
//! without touching the network.

mod api;
mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub use provider::TranslationProvider;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, from_lang: &str, to_lang: &str) -> Result<String>;
}
