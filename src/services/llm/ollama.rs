//! Ollama generation API client
//!
//! API Flow:
//! 1. POST {api_url}/api/generate with `format: "json"` and `stream: false`
//! 2. The generated text comes back in the `response` field of a single JSON object

use crate::{
    error::{AppError, AppResult},
    services::llm::TextGenerator,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    http_client: HttpClient,
    api_url: String,
    model: String,
}

impl OllamaClient {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(api_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.api_url)
    }
}

#[async_trait::async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            format: "json",
            stream: false,
        };

        let response = self
            .http_client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                model = %self.model,
                "Generation request failed"
            );
            return Err(AppError::UpstreamService(format!(
                "Ollama API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        let generated: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize Ollama response"
            );
            AppError::MalformedResponse(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            model = %self.model,
            chars = generated.response.len(),
            provider = "ollama",
            "Generation completed"
        );

        Ok(generated.response)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
