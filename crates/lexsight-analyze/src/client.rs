//! Generative model clients.

use std::time::Duration;

use async_trait::async_trait;
use lexsight_core::AnalysisError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    /// Low temperature for factual document analysis.
    pub const ANALYSIS: Self = Self {
        temperature: 0.1,
        top_k: 40,
        top_p: 0.8,
        max_output_tokens: 8192,
    };

    pub const RISK: Self = Self {
        temperature: 0.3,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 2048,
    };

    pub const CHAT: Self = Self {
        temperature: 0.7,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 2048,
    };
}

/// A text-in, text-out generative model service.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Run one prompt against `model` and return the generated text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, AnalysisError>;
}

/// Google Gemini `generateContent` REST client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request_body(prompt: &str, params: &GenerationParams) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": params.temperature,
                "topK": params.top_k,
                "topP": params.top_p,
                "maxOutputTokens": params.max_output_tokens,
            }
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        debug!("Calling {} ({} prompt chars)", url, prompt.len());

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&Self::request_body(prompt, params))
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {} for model {}", status, model);
            return Err(AnalysisError::Api { status, body });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Request(format!("Invalid response body: {}", e)))?;

        extract_candidate_text(&payload).ok_or(AnalysisError::EmptyResponse)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_candidate_text(payload: &serde_json::Value) -> Option<String> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = GeminiClient::request_body("Summarize", &GenerationParams::RISK);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Summarize");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["generationConfig"]["temperature"], 0.3);
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": " 1}" }] }
            }]
        });
        assert_eq!(extract_candidate_text(&payload).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_blocked_response_is_empty() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(extract_candidate_text(&payload).is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = GeminiClient::new(DEFAULT_GEMINI_BASE_URL, None, Duration::from_secs(1)).unwrap();
        let err = client
            .generate("gemini-1.5-flash", "hi", &GenerationParams::CHAT)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingApiKey));
    }
}
