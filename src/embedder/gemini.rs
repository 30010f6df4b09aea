//! Google Gemini embedding client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::ProviderError;
use crate::http;

const PROVIDER: &str = "google";

/// Upper bound the batch endpoint accepts per call.
pub const MAX_BATCH: usize = 100;

/// Blocking embeddings client for the Generative Language `batchEmbedContents` endpoint.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    batch_size: usize,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    ///
    /// # Arguments
    /// * `api_key` - Value for the `x-goog-api-key` header (usually from `GOOGLE_API_KEY`)
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    /// * `model` - Resource name such as `models/embedding-001`; the `models/` prefix is optional
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self, ProviderError> {
        let api_key = http::require_key(PROVIDER, api_key)?;
        let model = model_resource(model);
        let client = http::json_client(
            PROVIDER,
            HeaderName::from_static("x-goog-api-key"),
            api_key,
            timeout,
        )?;
        let endpoint = format!(
            "{}/{}:batchEmbedContents",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            endpoint,
            model,
            batch_size: batch_size.clamp(1, MAX_BATCH),
        })
    }
}

/// Normalizes `embedding-001` and `models/embedding-001` to the latter.
pub(crate) fn model_resource(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl Embedder for GeminiEmbedder {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = BatchEmbedRequest {
            requests: inputs
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };
        let response = self.client.post(&self.endpoint).json(&request).send();
        let parsed: BatchEmbedResponse = http::read_json(PROVIDER, response)?;
        parsed.into_vectors(inputs.len())
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

impl BatchEmbedResponse {
    fn into_vectors(self, expected_len: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.embeddings.len() != expected_len {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!(
                    "returned {} embeddings for {} inputs",
                    self.embeddings.len(),
                    expected_len
                ),
            });
        }
        Ok(self.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
