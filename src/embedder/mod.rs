//! Text embedding providers.
//!
//! Both ingestion and query-time embedding go through the same [`Embedder`]
//! value, so stored vectors and query vectors always share a model and
//! dimension.

pub mod gemini;
pub mod openai;

use tracing::debug;

use crate::error::ProviderError;

pub use gemini::GeminiEmbedder;
pub use openai::OpenAiEmbedder;

/// Maps text to fixed-length vectors.
pub trait Embedder {
    /// Provider name used in errors and logs.
    fn provider(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// `provider/model` identity recorded with stored vectors.
    fn model_id(&self) -> String {
        format!("{}/{}", self.provider(), self.model())
    }

    /// Maximum number of inputs sent per request.
    fn batch_size(&self) -> usize;

    /// Embeds at most [`Embedder::batch_size`] inputs with a single request.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embeds any number of inputs; vector `i` belongs to `texts[i]`.
    fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(self.batch_size().max(1)).enumerate() {
            let embedded = self.embed_batch(batch)?;
            if embedded.len() != batch.len() {
                return Err(ProviderError::InvalidResponse {
                    provider: self.provider(),
                    message: format!(
                        "returned {} embeddings for {} inputs",
                        embedded.len(),
                        batch.len()
                    ),
                });
            }
            debug!(batch = batch_no, size = batch.len(), "embedded batch");
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Embeds a single query string.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_many(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.provider(),
                message: "empty embedding result".to_string(),
            })
    }
}
