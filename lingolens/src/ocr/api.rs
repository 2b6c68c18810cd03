use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{LingoError, Result};

/// Client for an Azure AI Vision Image Analysis endpoint (`read` feature).
#[derive(Clone, Debug)]
pub struct AzureVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

/// Client for an OpenAI-compatible vision chat-completion endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

// --- Azure Image Analysis response shape -----------------------------------
// Every level is optional: a response with no readable text omits parts of
// the tree, and that must surface as empty text, not a parse error.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    read_result: Option<ReadResult>,
}

#[derive(Debug, Deserialize)]
struct ReadResult {
    #[serde(default)]
    blocks: Vec<ReadBlock>,
}

#[derive(Debug, Deserialize)]
struct ReadBlock {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
struct ReadLine {
    #[serde(default)]
    text: String,
}

/// Concatenate every line of every block with single-space joins.
fn collect_block_text(response: &AnalyzeResponse) -> String {
    let Some(ref read) = response.read_result else {
        return String::new();
    };

    read.blocks
        .iter()
        .flat_map(|block| block.lines.iter())
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl AzureVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LingoError::Ocr("API key required for Azure Vision OCR".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| LingoError::Ocr("Base URL required for Azure Vision OCR".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            max_retries: config.max_retries,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let url = format!(
            "{}/computervision/imageanalysis:analyze?api-version=2023-10-01&features=read",
            self.base_url.trim_end_matches('/')
        );

        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(&url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .header("Content-Type", "application/octet-stream")
                .body(image_bytes.to_vec())
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if resp.status().is_success() {
                        let analysis: AnalyzeResponse = resp
                            .json()
                            .await
                            .map_err(|e| LingoError::Ocr(format!("Failed to parse response: {e}")))?;
                        return Ok(collect_block_text(&analysis));
                    } else if resp.status().as_u16() == 429 || resp.status().is_server_error() {
                        retries += 1;
                        if retries >= self.max_retries {
                            return Err(LingoError::Ocr(format!(
                                "API request failed after {} retries: {}",
                                self.max_retries,
                                resp.status()
                            )));
                        }
                        let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        let status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        return Err(LingoError::Ocr(format!(
                            "API request failed: {status} - {body}"
                        )));
                    }
                }
                Err(e) => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(LingoError::Ocr(format!(
                            "API request failed after {} retries: {e}",
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

// --- OpenAI-compatible vision chat -----------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

impl OpenAiVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LingoError::Ocr("API key required for OpenAI Vision".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let model = config
            .model
            .split_once('/')
            .map(|(_, m)| m.to_string())
            .unwrap_or_else(|| "gpt-4o".to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            max_retries: config.max_retries,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let base64_image = STANDARD.encode(image_bytes);
        let data_url = format!("data:image/png;base64,{base64_image}");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: "Extract all text from this image. Return only the extracted text without any explanations or formatting.".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if resp.status().is_success() {
                        let chat_response: ChatResponse = resp
                            .json()
                            .await
                            .map_err(|e| LingoError::Ocr(format!("Failed to parse response: {e}")))?;

                        return chat_response
                            .choices
                            .first()
                            .map(|c| c.message.content.clone())
                            .ok_or_else(|| LingoError::Ocr("No response from API".to_string()));
                    } else if resp.status().as_u16() == 429 || resp.status().is_server_error() {
                        retries += 1;
                        if retries >= self.max_retries {
                            return Err(LingoError::Ocr(format!(
                                "API request failed after {} retries: {}",
                                self.max_retries,
                                resp.status()
                            )));
                        }
                        let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        let status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        return Err(LingoError::Ocr(format!(
                            "API request failed: {status} - {body}"
                        )));
                    }
                }
                Err(e) => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(LingoError::Ocr(format!(
                            "API request failed after {} retries: {e}",
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_key: Option<&str>, base_url: Option<String>) -> OcrConfig {
        OcrConfig {
            model: "azure/image-analysis".to_string(),
            api_key: api_key.map(String::from),
            base_url,
            languages: "eng".to_string(),
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    #[test]
    fn test_azure_client_requires_api_key() {
        let config = make_config(None, Some("https://example.test".to_string()));
        let result = AzureVisionClient::new(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key required"));
    }

    #[test]
    fn test_azure_client_requires_base_url() {
        let config = make_config(Some("key"), None);
        let result = AzureVisionClient::new(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_openai_client_requires_api_key() {
        let config = make_config(None, None);
        let result = OpenAiVisionClient::new(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_block_text_joins_all_lines_with_spaces() {
        let response: AnalyzeResponse = serde_json::from_value(serde_json::json!({
            "readResult": {
                "blocks": [
                    { "lines": [ { "text": "HELLO" }, { "text": "WORLD" } ] },
                    { "lines": [ { "text": "AGAIN" } ] }
                ]
            }
        }))
        .unwrap();
        assert_eq!(collect_block_text(&response), "HELLO WORLD AGAIN");
    }

    #[test]
    fn test_missing_read_result_yields_empty_text() {
        let response: AnalyzeResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(collect_block_text(&response), "");
    }

    #[tokio::test]
    async fn test_azure_ocr_extracts_text_from_analyze_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/computervision/imageanalysis:analyze"))
            .and(header("Ocp-Apim-Subscription-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "readResult": {
                    "blocks": [ { "lines": [ { "text": "STOP" } ] } ]
                }
            })))
            .mount(&server)
            .await;

        let config = make_config(Some("secret"), Some(server.uri()));
        let client = AzureVisionClient::new(&config).unwrap();
        let text = client.ocr(&[0u8; 8]).await.unwrap();
        assert_eq!(text, "STOP");
    }

    #[tokio::test]
    async fn test_azure_ocr_non_retryable_error_is_typed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let config = make_config(Some("wrong"), Some(server.uri()));
        let client = AzureVisionClient::new(&config).unwrap();
        let result = client.ocr(&[0u8; 8]).await;
        assert!(matches!(result, Err(LingoError::Ocr(_))));
    }

    #[tokio::test]
    async fn test_azure_ocr_gives_up_after_max_retries_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let config = make_config(Some("secret"), Some(server.uri()));
        let client = AzureVisionClient::new(&config).unwrap();
        let result = client.ocr(&[0u8; 8]).await;
        assert!(result.is_err());
    }
}
