//! Mock backend for testing
//!
//! Replies with a canned response (or a canned failure) and records every call
//! so tests can check which prompt and media reached the provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{ExtractionChannel, MediaPart};
use super::AIBackend;

/// Reply used when no response is configured
const DEFAULT_RESPONSE: &str = r#"{"title":"Gasto de prueba","date":null,"description":"","detectedCategoryAmounts":[{"categoryName":"Otros","amount":10.0,"items":null}],"detectedPayments":[],"detectedSplits":[]}"#;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub channel: ExtractionChannel,
    pub prompt: String,
    /// Mime types of the media parts, in order
    pub mime_types: Vec<String>,
    /// Text input (text channel only)
    pub text: Option<String>,
}

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    reply: Reply,
    /// Whether health_check should return true
    pub healthy: bool,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockBackend {
    /// Create a new mock backend with the default reply (healthy)
    pub fn new() -> Self {
        Self::with_response(DEFAULT_RESPONSE)
    }

    /// Create a mock backend that always replies with `response`
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            reply: Reply::Text(response.into()),
            healthy: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock backend whose calls fail with a provider error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(message.into()),
            healthy: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create from `MOCK_AI_RESPONSE`, falling back to the default reply
    pub fn from_env() -> Self {
        match std::env::var("MOCK_AI_RESPONSE") {
            Ok(response) if !response.trim().is_empty() => Self::with_response(response),
            _ => Self::new(),
        }
    }

    /// Calls received so far (shared between clones)
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn respond(&self, call: MockCall) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(Error::Provider(message.clone())),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn analyze_audio(&self, audio: &MediaPart, prompt: &str) -> Result<String> {
        self.respond(MockCall {
            channel: ExtractionChannel::Audio,
            prompt: prompt.to_string(),
            mime_types: vec![audio.mime_type.clone()],
            text: None,
        })
    }

    async fn analyze_images(&self, images: &[MediaPart], prompt: &str) -> Result<String> {
        self.respond(MockCall {
            channel: ExtractionChannel::Images,
            prompt: prompt.to_string(),
            mime_types: images.iter().map(|i| i.mime_type.clone()).collect(),
            text: None,
        })
    }

    async fn analyze_text(&self, text: &str, prompt: &str) -> Result<String> {
        self.respond(MockCall {
            channel: ExtractionChannel::Text,
            prompt: prompt.to_string(),
            mime_types: vec![],
            text: Some(text.to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
