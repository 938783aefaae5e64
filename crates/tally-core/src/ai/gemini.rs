//! Google Gemini backend implementation
//!
//! Talks to the Generative Language REST API:
//! `POST {host}/v1beta/models/{model}:generateContent`
//!
//! The API key goes in the `x-goog-api-key` header, never in the URL.
//!
//! Media is sent as base64 `inlineData` parts followed by a text part carrying
//! the prompt. The reply text is the concatenation of the first candidate's
//! text parts.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::MediaPart;
use super::AIBackend;

const DEFAULT_HOST: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `GEMINI_API_KEY`
    /// Optional: `GEMINI_MODEL` (default: gemini-2.5-flash), `GEMINI_HOST`
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let host = std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        Some(Self::new(&host, &model, &api_key))
    }

    /// Rebuild the HTTP client with a per-request timeout
    pub fn with_timeout(self, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            ..self
        })
    }

    /// Send one generateContent request and return the reply text
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.text();
        if text.trim().is_empty() {
            return Err(Error::Provider("AI response is empty".into()));
        }

        debug!(model = %self.model, "Gemini response: {}", text);
        Ok(text)
    }
}

fn inline_part(media: &MediaPart) -> Part {
    Part::InlineData {
        inline_data: InlineData {
            mime_type: media.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&media.data),
        },
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// Request part: inline media or text
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// generateContent response body
#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn analyze_audio(&self, audio: &MediaPart, prompt: &str) -> Result<String> {
        self.generate(vec![
            inline_part(audio),
            Part::Text {
                text: prompt.to_string(),
            },
        ])
        .await
    }

    async fn analyze_images(&self, images: &[MediaPart], prompt: &str) -> Result<String> {
        let mut parts: Vec<Part> = images.iter().map(inline_part).collect();
        parts.push(Part::Text {
            text: prompt.to_string(),
        });
        self.generate(parts).await
    }

    async fn analyze_text(&self, text: &str, prompt: &str) -> Result<String> {
        self.generate(vec![
            Part::Text {
                text: text.to_string(),
            },
            Part::Text {
                text: prompt.to_string(),
            },
        ])
        .await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);
        match self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
