//! Gemini Provider
//!
//! Implementation of the GenerativeProvider trait for the Gemini REST API.
//! Requests JSON output and concatenates the candidate's text parts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http_client::build_http_client;
use crate::provider::GenerativeProvider;

/// Default Gemini API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default client-level request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini REST provider
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| GEMINI_API_URL.to_string()),
            client: build_http_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request_body(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        }
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, model: &str, prompt: &str) -> ProviderResult<String> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationFailed {
                message: "API key not configured for gemini".to_string(),
            });
        }

        let url = self.endpoint(model);
        debug!(model, "sending generate request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_ms: DEFAULT_TIMEOUT_SECS * 1000,
                    }
                } else {
                    ProviderError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ProviderError::NetworkError {
            message: format!("failed to read response body: {e}"),
        })?;

        if !(200..300).contains(&status) {
            warn!(model, status, "generate request failed");
            return Err(ProviderError::from_http(status, &body));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::MalformedOutput {
                message: format!("unexpected response shape: {e}"),
            })?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedOutput {
                message: "response contained no candidate text".to_string(),
            });
        }

        Ok(text)
    }
}
