use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use super::{AnswerGenerator, GenerationSettings};
use crate::error::ProviderError;
use crate::http;

const PROVIDER: &str = "openai";

pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    settings: GenerationSettings,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        settings: GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = http::require_key(PROVIDER, api_key)?;
        let client = http::json_client(
            PROVIDER,
            AUTHORIZATION,
            &format!("Bearer {api_key}"),
            timeout,
        )?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            settings,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_output_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

impl AnswerGenerator for OpenAiGenerator {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = self.request(prompt);
        let response = self.client.post(&self.endpoint).json(&body).send();
        let parsed: ChatResponse = http::read_json(PROVIDER, response)?;
        parsed.into_answer()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn into_answer(self) -> Result<String, ProviderError> {
        self.choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "completion contained no text".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}
