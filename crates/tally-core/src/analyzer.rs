//! Expense analysis service
//!
//! One call per channel runs the whole pipeline:
//! context -> prompt -> provider -> parse -> validate -> reconcile.
//! The provider call is the only async step and is not retried here.

use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, info};

use crate::ai::parsing::parse_extraction_response;
use crate::ai::{AIBackend, ExtractionChannel, MediaPart};
use crate::config::TallyConfig;
use crate::context::{ContextBuilder, GroupStore};
use crate::error::{Error, Result};
use crate::models::{ExpenseTemplate, ReconciliationContext};
use crate::prompts::{build_prompt, PromptLibrary};
use crate::reconcile::reconcile_at;
use crate::validation::validate;

/// Most images accepted in one request
pub const MAX_IMAGES: usize = 10;

/// Message for a missing or blank text description
pub const EMPTY_TEXT_MESSAGE: &str = "El campo 'text' es requerido y no puede estar vacío.";

/// Turns raw user input into an editable expense draft
pub struct ExpenseAnalyzer<S: GroupStore, B: AIBackend> {
    store: S,
    backend: B,
    config: TallyConfig,
    prompts: RwLock<PromptLibrary>,
}

impl<S: GroupStore, B: AIBackend> ExpenseAnalyzer<S, B> {
    /// Create an analyzer using the config's prompt override directory
    pub fn new(store: S, backend: B, config: TallyConfig) -> Self {
        let prompts = config.prompt_library();
        Self {
            store,
            backend,
            config,
            prompts: RwLock::new(prompts),
        }
    }

    /// Replace the prompt library
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = RwLock::new(prompts);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Extract an expense from a typed description
    pub async fn analyze_text(
        &self,
        group_id: &str,
        user_id: &str,
        text: &str,
        timezone_offset_hours: Option<f64>,
    ) -> Result<ExpenseTemplate> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(EMPTY_TEXT_MESSAGE.to_string()));
        }

        let ctx = self.context(group_id, user_id, timezone_offset_hours)?;
        let prompt = self.prompt(ExtractionChannel::Text, &ctx)?;
        let raw = self.backend.analyze_text(text, &prompt).await?;
        self.finish(ExtractionChannel::Text, &raw, &ctx)
    }

    /// Extract an expense from a voice memo
    pub async fn analyze_audio(
        &self,
        group_id: &str,
        user_id: &str,
        audio: MediaPart,
    ) -> Result<ExpenseTemplate> {
        if audio.data.is_empty() {
            return Err(Error::InvalidInput(
                "No audio file uploaded. Please provide a voice recording.".to_string(),
            ));
        }
        check_mime(&audio, "audio/")?;

        let ctx = self.context(group_id, user_id, None)?;
        let prompt = self.prompt(ExtractionChannel::Audio, &ctx)?;
        let raw = self.backend.analyze_audio(&audio, &prompt).await?;
        self.finish(ExtractionChannel::Audio, &raw, &ctx)
    }

    /// Extract an expense from receipt photos
    pub async fn analyze_images(
        &self,
        group_id: &str,
        user_id: &str,
        images: Vec<MediaPart>,
    ) -> Result<ExpenseTemplate> {
        if images.is_empty() {
            return Err(Error::InvalidInput(
                "No images uploaded. Please provide at least one receipt photo.".to_string(),
            ));
        }
        if images.len() > MAX_IMAGES {
            return Err(Error::InvalidInput(format!(
                "Too many images: {} (maximum {})",
                images.len(),
                MAX_IMAGES
            )));
        }
        for image in &images {
            check_mime(image, "image/")?;
        }

        let ctx = self.context(group_id, user_id, None)?;
        let prompt = self.prompt(ExtractionChannel::Images, &ctx)?;
        let raw = self.backend.analyze_images(&images, &prompt).await?;
        self.finish(ExtractionChannel::Images, &raw, &ctx)
    }

    /// Run an already-obtained provider reply through parse/validate/reconcile
    ///
    /// Used to replay saved responses without calling the provider.
    pub fn reconcile_response(
        &self,
        group_id: &str,
        user_id: &str,
        channel: ExtractionChannel,
        raw: &str,
        timezone_offset_hours: Option<f64>,
    ) -> Result<ExpenseTemplate> {
        let ctx = self.context(group_id, user_id, timezone_offset_hours)?;
        self.finish(channel, raw, &ctx)
    }

    fn context(
        &self,
        group_id: &str,
        user_id: &str,
        timezone_offset_hours: Option<f64>,
    ) -> Result<ReconciliationContext> {
        ContextBuilder::new(&self.store).build(group_id, user_id, timezone_offset_hours)
    }

    fn prompt(&self, channel: ExtractionChannel, ctx: &ReconciliationContext) -> Result<String> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        build_prompt(&mut prompts, channel, ctx, Utc::now())
    }

    fn finish(
        &self,
        channel: ExtractionChannel,
        raw: &str,
        ctx: &ReconciliationContext,
    ) -> Result<ExpenseTemplate> {
        debug!(channel = %channel, model = %self.backend.model(), "Raw AI response: {}", raw);

        let candidate = parse_extraction_response(raw)?;
        let validated = validate(candidate, self.config.policy_for(channel))?;
        let template = reconcile_at(&validated, ctx, Utc::now());

        info!(
            channel = %channel,
            total = template.total_amount,
            categories = template.category_amounts.len(),
            "Expense analyzed"
        );
        Ok(template)
    }
}

fn check_mime(media: &MediaPart, prefix: &str) -> Result<()> {
    if media.mime_type.to_lowercase().starts_with(prefix) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Unsupported file type '{}' (expected {}*)",
            media.mime_type, prefix
        )))
    }
}
