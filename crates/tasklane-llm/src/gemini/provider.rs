//! Gemini provider implementation

use super::config::GeminiConfig;
use super::types::*;
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::AiProvider;
use crate::util::sanitize_api_error;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Finish reasons that mean the model refused rather than answered.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub(crate) fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: s.clone() }],
            }),
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(
                    request.max_tokens.unwrap_or(self.config.default_max_tokens),
                ),
                temperature: request.temperature,
            }),
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };
        let body = self.build_request(&request);
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.config.timeout))?;

        if !(200..300).contains(&status) {
            warn!(status, "Gemini API error response");
            return Err(classify_error_status(status, &text));
        }

        debug!(bytes = text.len(), "Gemini response received");
        parse_success(&text, &model)
    }
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(timeout.as_millis() as u64)
    } else {
        Error::Network(e.to_string())
    }
}

/// Map a non-2xx response to a classified error.
pub(crate) fn classify_error_status(status: u16, body: &str) -> Error {
    let detail = serde_json::from_str::<GeminiError>(body)
        .map(|e| format!("{}: {}", e.error.status, e.error.message))
        .unwrap_or_else(|_| format!("HTTP {status}"));

    match status {
        429 => Error::RateLimit,
        408 | 500..=599 => Error::ServerError(sanitize_api_error(&detail)),
        _ => Error::Api(sanitize_api_error(&detail)),
    }
}

/// Parse a 2xx body into a completion, treating blocked output as a
/// definitive rejection.
pub(crate) fn parse_success(body: &str, model: &str) -> Result<CompletionResponse> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("malformed body: {e}")))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(Error::ContentRejected(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("no candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason {
            Some(reason) if BLOCKED_FINISH_REASONS.contains(&reason.as_str()) => {
                Err(Error::ContentRejected(reason))
            }
            _ => Err(Error::InvalidResponse("empty completion".to_string())),
        };
    }

    Ok(CompletionResponse {
        content: text,
        usage: response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }),
        finish_reason: candidate.finish_reason,
        model: response.model_version.unwrap_or_else(|| model.to_string()),
    })
}
