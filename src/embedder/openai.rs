//! OpenAI-based embedding client implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::ProviderError;
use crate::http;

const PROVIDER: &str = "openai";

/// Blocking embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self, ProviderError> {
        let api_key = http::require_key(PROVIDER, api_key)?;
        if model.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "missing embedding model name".to_string(),
            });
        }
        let client = http::json_client(
            PROVIDER,
            AUTHORIZATION,
            &format!("Bearer {api_key}"),
            timeout,
        )?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
            batch_size: batch_size.max(1),
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sends a batch of strings to OpenAI and returns embedding vectors.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let response = self.client.post(&self.endpoint).json(&request).send();
        let parsed: EmbeddingResponse = http::read_json(PROVIDER, response)?;
        parsed.into_vectors(inputs.len())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    fn into_vectors(mut self, expected_len: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.data.len() != expected_len {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!(
                    "returned {} embeddings for {} inputs",
                    self.data.len(),
                    expected_len
                ),
            });
        }
        self.data.sort_by_key(|entry| entry.index);
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
