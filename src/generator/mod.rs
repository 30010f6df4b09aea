//! Text-generation providers used to answer assembled prompts.

pub mod gemini;
pub mod openai;

use crate::error::ProviderError;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

/// Default sampling temperature; zero keeps answers focused on the context.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
/// Default completion budget in tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 500;

/// Trait implemented by concrete LLM providers.
pub trait AnswerGenerator {
    /// Provider name used in errors and logs.
    fn provider(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Sends `prompt` and returns the raw completion text.
    fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Sampling knobs shared by the various providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}
