//! Pluggable AI provider abstraction
//!
//! The provider is a black box: media or text plus a prompt in, raw text out.
//! Everything after that (decoding, validation, reconciliation) happens in the
//! core and does not depend on which backend answered.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all providers
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.5-flash)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)
//! - `MOCK_AI_RESPONSE`: Canned reply for the mock backend (optional)

mod gemini;
mod mock;
pub mod parsing;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockCall};
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all AI providers
///
/// Each method returns the model's raw reply text. Provider failures
/// (network, HTTP status, empty reply) propagate as errors; no retries.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Extract an expense from a voice memo
    async fn analyze_audio(&self, audio: &MediaPart, prompt: &str) -> Result<String>;

    /// Extract an expense from receipt photos
    async fn analyze_images(&self, images: &[MediaPart], prompt: &str) -> Result<String>;

    /// Extract an expense from a typed description
    async fn analyze_text(&self, text: &str, prompt: &str) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini (generateContent REST API)
    Gemini(GeminiBackend),
    /// Canned responses for tests and offline runs
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `gemini` (default): Uses GEMINI_API_KEY, GEMINI_MODEL and GEMINI_HOST
    /// - `mock`: Creates a mock backend replying with MOCK_AI_RESPONSE
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "gemini".to_string());

        match backend.to_lowercase().as_str() {
            "gemini" | "google" => GeminiBackend::from_env().map(AIClient::Gemini),
            "mock" => Some(AIClient::Mock(MockBackend::from_env())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                GeminiBackend::from_env().map(AIClient::Gemini)
            }
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(host: &str, model: &str, api_key: &str) -> Self {
        AIClient::Gemini(GeminiBackend::new(host, model, api_key))
    }

    /// Create a mock backend that always replies with `response`
    pub fn mock(response: impl Into<String>) -> Self {
        AIClient::Mock(MockBackend::with_response(response))
    }

    /// Apply a per-request timeout (no-op for the mock)
    pub fn with_timeout(self, timeout: Duration) -> Result<Self> {
        match self {
            AIClient::Gemini(b) => Ok(AIClient::Gemini(b.with_timeout(timeout)?)),
            AIClient::Mock(b) => Ok(AIClient::Mock(b)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn analyze_audio(&self, audio: &MediaPart, prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.analyze_audio(audio, prompt).await,
            AIClient::Mock(b) => b.analyze_audio(audio, prompt).await,
        }
    }

    async fn analyze_images(&self, images: &[MediaPart], prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.analyze_images(images, prompt).await,
            AIClient::Mock(b) => b.analyze_images(images, prompt).await,
        }
    }

    async fn analyze_text(&self, text: &str, prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.analyze_text(text, prompt).await,
            AIClient::Mock(b) => b.analyze_text(text, prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
