use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    llm::{
        copywriter::strip_hashtags,
        model::{call_with_model_fallback, is_model_rejection, ModelSlot},
    },
    Copywriter,
};

/// Anthropic Messages API client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: ModelSlot,
}

#[derive(Debug, thiserror::Error)]
pub enum AnthropicError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Claude returned an empty {0}")]
    EmptyResponse(&'static str),
}

impl AnthropicClient {
    pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
    const FALLBACK_MODELS: &[&str] = &[
        "claude-haiku-4-5-20251001",
        "claude-sonnet-4-5-20250929",
        "claude-3-5-haiku-latest",
    ];
    const API_VERSION: &str = "2023-06-01";

    const POST_PROMPT: &str = include_str!("./prompts/linkedin_post.txt");
    const NEWSLETTER_PROMPT: &str = include_str!("./prompts/newsletter.txt");

    const POST_MAX_TOKENS: u32 = 1200;
    const NEWSLETTER_MAX_TOKENS: u32 = 2200;

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".into(),
            model: ModelSlot::new("claude", model, Self::FALLBACK_MODELS),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> String {
        self.model.current()
    }

    #[tracing::instrument(skip(self, prompt))]
    pub async fn send_message_request(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AnthropicError> {
        let body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": 0.7,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AnthropicError::Api { status, message });
        }

        Ok(resp.json::<MessageResponse>().await?.text())
    }

    pub async fn list_models(&self) -> Result<Vec<String>, AnthropicError> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("limit", "100")])
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AnthropicError::Api { status, message });
        }

        let listing = resp.json::<ModelListResponse>().await?;
        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    async fn complete(
        &self,
        instructions: &str,
        transcript: &str,
        max_tokens: u32,
        what: &'static str,
    ) -> Result<String, AnthropicError> {
        let prompt = format!("{instructions}\nTRANSCRIPT:\n{transcript}");

        let text = call_with_model_fallback(
            &self.model,
            |e: &AnthropicError, model| {
                matches!(e, AnthropicError::Api { status, message } if is_model_rejection(*status, message, model))
            },
            || self.list_models(),
            |model| {
                let prompt = prompt.as_str();
                async move { self.send_message_request(&model, prompt, max_tokens).await }
            },
        )
        .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(AnthropicError::EmptyResponse(what));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessageResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    id: String,
}

impl Copywriter for AnthropicClient {
    type Error = AnthropicError;

    async fn linkedin_post(&self, transcript: &str) -> Result<String, Self::Error> {
        let post = self
            .complete(
                Self::POST_PROMPT,
                transcript,
                Self::POST_MAX_TOKENS,
                "LinkedIn post",
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to draft LinkedIn post"))?;

        Ok(strip_hashtags(&post))
    }

    async fn newsletter(&self, transcript: &str) -> Result<String, Self::Error> {
        self.complete(
            Self::NEWSLETTER_PROMPT,
            transcript,
            Self::NEWSLETTER_MAX_TOKENS,
            "newsletter",
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to draft newsletter"))
    }
}
