use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use super::{AnswerGenerator, GenerationSettings};
use crate::embedder::gemini::model_resource;
use crate::error::ProviderError;
use crate::http;

const PROVIDER: &str = "google";

pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    settings: GenerationSettings,
}

impl GeminiGenerator {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        settings: GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = http::require_key(PROVIDER, api_key)?;
        let client = http::json_client(
            PROVIDER,
            HeaderName::from_static("x-goog-api-key"),
            api_key,
            timeout,
        )?;
        let model = model_resource(model);
        let endpoint = format!(
            "{}/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            endpoint,
            model,
            settings,
        })
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        }
    }
}

impl AnswerGenerator for GeminiGenerator {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = self.request(prompt);
        let response = self.client.post(&self.endpoint).json(&body).send();
        let parsed: GenerateResponse = http::read_json(PROVIDER, response)?;
        parsed.into_answer()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn into_answer(self) -> Result<String, ProviderError> {
        let answer = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if answer.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "response missing text content".to_string(),
            });
        }
        Ok(answer)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_generation_config() {
        let generator = GeminiGenerator::new(
            "key",
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-2.5-flash-lite",
            GenerationSettings::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            generator.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
        let json = serde_json::to_value(generator.request("PROMPT")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "PROMPT");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [
            {"text": "Revenue was "}, {"text": "10 million reais."}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_answer().unwrap(), "Revenue was 10 million reais.");
    }

    #[test]
    fn blocked_response_is_an_error() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            parsed.into_answer(),
            Err(ProviderError::InvalidResponse { provider: "google", .. })
        ));
    }
}
