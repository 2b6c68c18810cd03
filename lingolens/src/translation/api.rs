use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslationConfig;
use crate::error::{LingoError, Result};

/// Client for a Translator-v3-style REST endpoint:
/// `POST {base}/translate?api-version=3.0&from=..&to=..` with a JSON body of
/// `[{"Text": ...}]` and a response of
/// `[{detectedLanguage?, translations: [{text, to}]}]`.
#[derive(Clone, Debug)]
pub struct TranslatorClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct TranslateInput {
    #[serde(rename = "Text")]
    text: String,
}

// The nested response is deserialized leniently: any missing field at any
// level collapses to "no translation" rather than a parse error.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationEntry {
    detected_language: Option<DetectedLanguage>,
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    #[serde(default)]
    language: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(default)]
    text: String,
}

/// First entry, first translation candidate; everything else is ignored.
fn first_translation(entries: &[TranslationEntry]) -> String {
    entries
        .first()
        .and_then(|entry| entry.translations.first())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

impl TranslatorClient {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LingoError::Translation("API key required for translation".to_string())
        })?;

        let base_url = config.base_url.clone().ok_or_else(|| {
            LingoError::Translation("Base URL required for translation".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Translation(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            max_retries: config.max_retries,
        })
    }

    pub async fn translate(&self, text: &str, from_lang: &str, to_lang: &str) -> Result<String> {
        let url = format!(
            "{}/translate?api-version=3.0&from={from_lang}&to={to_lang}",
            self.base_url.trim_end_matches('/')
        );

        let body = vec![TranslateInput {
            text: text.to_string(),
        }];

        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(&url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if resp.status().is_success() {
                        let entries: Vec<TranslationEntry> = resp.json().await.map_err(|e| {
                            LingoError::Translation(format!("Failed to parse response: {e}"))
                        })?;

                        if let Some(detected) =
                            entries.first().and_then(|e| e.detected_language.as_ref())
                        {
                            debug!(
                                language = %detected.language,
                                score = detected.score,
                                "Translator detected source language"
                            );
                        }

                        return Ok(first_translation(&entries));
                    } else if resp.status().as_u16() == 429 || resp.status().is_server_error() {
                        retries += 1;
                        if retries >= self.max_retries {
                            return Err(LingoError::TranslationHttp {
                                status: resp.status().as_u16(),
                                body: resp.text().await.unwrap_or_default(),
                            });
                        }
                        let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        return Err(LingoError::TranslationHttp {
                            status: resp.status().as_u16(),
                            body: resp.text().await.unwrap_or_default(),
                        });
                    }
                }
                Err(e) => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(LingoError::Translation(format!(
                            "Request failed after {} retries: {e}",
                            self.max_retries
                        )));
                    }
                    let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
