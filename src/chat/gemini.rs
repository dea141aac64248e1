use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CompletionError, CompletionModel, Turn};
use crate::config::GeminiConfig;
use crate::models::ChatRole;

/// Google Generative Language `generateContent` client.
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(config: &GeminiConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

pub fn request_body(contents: &[Turn]) -> Value {
    let contents: Vec<Value> = contents
        .iter()
        .map(|turn| {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.text }] })
        })
        .collect();
    json!({ "contents": contents })
}

/// Concatenates the text parts of the first candidate.
pub fn parse_response(body: &Value) -> Option<String> {
    let parts = body.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, contents: &[Turn]) -> Result<String, CompletionError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(contents))
            .send()
            .await
            .map_err(|e| CompletionError::from(format!("Gemini request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(512)
                .collect::<String>();
            return Err(format!("Gemini API error {status}: {body}").into());
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::from(format!("Invalid Gemini response: {e}")))?;

        parse_response(&body).ok_or_else(|| CompletionError::from("Gemini returned no text"))
    }
}
