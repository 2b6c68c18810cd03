use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::TranslationConfig;
use crate::error::{LingoError, Result};

use super::api::TranslatorClient;
use super::Translator;

enum TranslationBackend {
    Api { client: TranslatorClient },
    Unavailable { reason: String },
}

pub struct TranslationProvider {
    backend: TranslationBackend,
}

impl TranslationProvider {
    pub fn new(config: &TranslationConfig) -> Self {
        let backend = match TranslatorClient::new(config) {
            Ok(client) => {
                info!(
                    from = %config.from_lang,
                    to = %config.to_lang,
                    "Translation backend initialized"
                );
                TranslationBackend::Api { client }
            }
            Err(e) => {
                let reason = format!("Translation backend unavailable: {e}");
                warn!("{}", reason);
                TranslationBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, TranslationBackend::Unavailable { .. })
    }
}

#[async_trait]
impl Translator for TranslationProvider {
    async fn translate(&self, text: &str, from_lang: &str, to_lang: &str) -> Result<String> {
        // Nothing to translate: skip the provider call entirely.
        if text.is_empty() {
            return Ok(String::new());
        }

        match &self.backend {
            TranslationBackend::Api { client } => client.translate(text, from_lang, to_lang).await,
            TranslationBackend::Unavailable { reason } => {
                Err(LingoError::Translation(reason.clone()))
            }
        }
    }
}

impl Clone for TranslationProvider {
    fn clone(&self) -> Self {
        match &self.backend {
            TranslationBackend::Api { client } => Self {
                backend: TranslationBackend::Api {
                    client: client.clone(),
                },
            },
            TranslationBackend::Unavailable { reason } => Self {
                backend: TranslationBackend::Unavailable {
                    reason: reason.clone(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> TranslationConfig {
        TranslationConfig {
            api_key: api_key.map(String::from),
            base_url: Some("https://example.test".to_string()),
            from_lang: "en".to_string(),
            to_lang: "ja".to_string(),
            timeout_secs: 5,
            max_retries: 3,
        }
    }

    #[test]
    fn test_missing_credentials_degrade_to_unavailable() {
        let provider = TranslationProvider::new(&make_config(None));
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits_even_when_unavailable() {
        let provider = TranslationProvider::new(&make_config(None));
        let result = provider.translate("", "en", "ja").await.unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_unavailable_backend_returns_typed_error_for_real_input() {
        let provider = TranslationProvider::new(&make_config(None));
        let result = provider.translate("HELLO", "en", "ja").await;
        assert!(matches!(result, Err(LingoError::Translation(_))));
    }
}
