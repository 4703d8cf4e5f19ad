//! OpenAI-compatible embedding client.
//!
//! Works with OpenAI, Azure-style proxies, Ollama, vLLM and any endpoint
//! exposing `POST {base_url}/embeddings`.

use async_trait::async_trait;
use dealdesk_config::EmbeddingConfig;
use dealdesk_core::error::SourceError;
use dealdesk_core::retrieval::Embedder;
use serde::Deserialize;
use tracing::debug;

/// Fallback wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible embedding provider.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Build from the `[embedding]` config section.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, SourceError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            SourceError::NotConfigured(
                "no embedding API key (set embedding.api_key or DEALDESK_API_KEY)".into(),
            )
        })?;
        Ok(Self::new(&config.api_url, api_key, &config.model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(SourceError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(SourceError::AuthenticationFailed("Invalid API key".into()));
        }
        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        parse_embedding(&text)
    }
}

/// Extract the first vector from an `/embeddings` response body.
fn parse_embedding(body: &str) -> Result<Vec<f32>, SourceError> {
    let api_resp: EmbeddingApiResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
    })?;

    if let Some(usage) = &api_resp.usage {
        debug!(
            model = %api_resp.model,
            prompt_tokens = usage.prompt_tokens,
            "Embedding response received"
        );
    }

    let embedding = api_resp
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .ok_or_else(|| SourceError::InvalidResponse("empty embedding data".into()))?;

    if embedding.is_empty() {
        return Err(SourceError::InvalidResponse("zero-length embedding".into()));
    }
    Ok(embedding)
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
    usage: Option<EmbeddingApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
}
