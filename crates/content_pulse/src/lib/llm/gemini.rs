use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    llm::model::{call_with_model_fallback, is_model_rejection, ModelSlot},
    Summarizer,
};

/// Google Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: ModelSlot,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Gemini returned an empty {0}")]
    EmptyResponse(&'static str),
}

impl GeminiClient {
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    const FALLBACK_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-pro"];

    const SUMMARY_PROMPT: &str = include_str!("./prompts/summary.txt");
    const BRIEF_PROMPT: &str = include_str!("./prompts/infographic_brief.txt");

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: ModelSlot::new("gemini", model, Self::FALLBACK_MODELS),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> String {
        self.model.current()
    }

    #[tracing::instrument(skip(self, system, user_content))]
    pub async fn send_generate_request(
        &self,
        model: &str,
        system: &str,
        user_content: &str,
    ) -> Result<String, GeminiError> {
        let body = json!({
            "systemInstruction": {
                "parts": [{ "text": system }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": user_content }]
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, message });
        }

        Ok(resp.json::<GenerateContentResponse>().await?.text())
    }

    /// Names of the models that support `generateContent`, without the
    /// `models/` prefix
    pub async fn list_models(&self) -> Result<Vec<String>, GeminiError> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("pageSize", "100")])
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, message });
        }

        let listing = resp.json::<ModelListResponse>().await?;
        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    async fn generate(
        &self,
        system: &str,
        user_content: &str,
        what: &'static str,
    ) -> Result<String, GeminiError> {
        let text = call_with_model_fallback(
            &self.model,
            |e: &GeminiError, model| {
                matches!(e, GeminiError::Api { status, message } if is_model_rejection(*status, message, model))
            },
            || self.list_models(),
            |model| async move { self.send_generate_request(&model, system, user_content).await },
        )
        .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(GeminiError::EmptyResponse(what));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl Summarizer for GeminiClient {
    type Error = GeminiError;

    async fn summarize(&self, transcript: &str) -> Result<String, Self::Error> {
        self.generate(
            Self::SUMMARY_PROMPT,
            &format!("TRANSCRIPT:\n{transcript}"),
            "summary",
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to summarize transcript"))
    }

    async fn infographic_brief(&self, summary: &str) -> Result<String, Self::Error> {
        self.generate(
            Self::BRIEF_PROMPT,
            &format!("SUMMARY:\n{summary}"),
            "infographic brief",
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to create infographic brief"))
    }
}
