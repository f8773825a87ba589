//! Gemini `generateContent` client for script generation and TTS.
//!
//! POSTs to `{base_url}/v1beta/models/{model}:generateContent` with the key
//! in the `x-goog-api-key` header. Speech comes back as base64 PCM in the
//! first part's `inlineData`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{Result, StudioError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
    /// Set on thought-summary parts, which are not part of the answer.
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, thought parts skipped.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// Base64 audio at `candidates[0].content.parts[0].inlineData.data`.
    pub fn audio_data(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()?
            .data
            .as_deref()
            .filter(|d| !d.is_empty())
    }
}

/// The remote generative API, behind a seam so the orchestrator can be
/// driven without the network.
#[async_trait]
pub trait GenerativeApi: Send + Sync {
    /// Free-form text generation. Returns the trimmed text.
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String>;

    /// Speech synthesis with a prebuilt voice.
    async fn synthesize_speech(
        &self,
        model: &str,
        text: &str,
        voice: &str,
    ) -> Result<GenerateContentResponse>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ApiConfig, api_key: String) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    async fn generate_content(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<GenerateContentResponse> {
        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| {
                if e.is_connect() {
                    warn!("Cannot connect to Gemini at {}", self.base_url);
                } else if e.is_timeout() {
                    warn!("Gemini request timed out");
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Gemini returned status {status} for model {model}");
            return Err(StudioError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait]
impl GenerativeApi for GeminiClient {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String> {
        debug!("Sending {} char prompt to '{model}'", prompt.len());
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self.generate_content(model, body).await?;
        let text = response
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(StudioError::EmptyResponse)?;
        debug!("'{model}' returned {} chars", text.len());
        Ok(text)
    }

    async fn synthesize_speech(
        &self,
        model: &str,
        text: &str,
        voice: &str,
    ) -> Result<GenerateContentResponse> {
        debug!("Synthesizing {} chars with voice {voice}", text.len());
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice }
                    }
                }
            }
        });

        self.generate_content(model, body).await
    }
}
