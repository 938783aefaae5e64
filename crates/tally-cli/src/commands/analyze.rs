//! Extraction commands
//!
//! `analyze` sends input to the configured provider; `reconcile` replays a
//! saved provider reply against the current group data without any network
//! call. Both print the resulting expense draft as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::{
    AIBackend, AIClient, Database, ExpenseAnalyzer, ExpenseTemplate, ExtractionChannel,
    MediaPart, MockBackend, TallyConfig,
};
use tracing::info;

/// Build an analyzer backed by the provider named in the environment
pub fn build_analyzer(
    db: Database,
    config: &TallyConfig,
) -> Result<ExpenseAnalyzer<Database, AIClient>> {
    let client = AIClient::from_env()
        .context("No AI backend configured. Set GEMINI_API_KEY, or AI_BACKEND=mock")?
        .with_timeout(config.provider_timeout)?;

    info!(model = %client.model(), host = %client.host(), "Using AI backend");
    Ok(ExpenseAnalyzer::new(db, client, config.clone()))
}

pub async fn cmd_analyze_text<B: AIBackend>(
    analyzer: &ExpenseAnalyzer<Database, B>,
    group_id: &str,
    user_id: &str,
    text: &str,
    tz_offset: Option<f64>,
) -> Result<()> {
    let template = analyzer
        .analyze_text(group_id, user_id, text, tz_offset)
        .await?;
    print_template(&template)
}

pub async fn cmd_analyze_images<B: AIBackend>(
    analyzer: &ExpenseAnalyzer<Database, B>,
    group_id: &str,
    user_id: &str,
    files: &[PathBuf],
) -> Result<()> {
    let images = files
        .iter()
        .map(|path| read_media(path, None))
        .collect::<Result<Vec<_>>>()?;

    eprintln!("🔍 Analyzing {} image(s)...", images.len());
    let template = analyzer.analyze_images(group_id, user_id, images).await?;
    print_template(&template)
}

pub async fn cmd_analyze_audio<B: AIBackend>(
    analyzer: &ExpenseAnalyzer<Database, B>,
    group_id: &str,
    user_id: &str,
    file: &Path,
    mime: Option<&str>,
) -> Result<()> {
    let audio = read_media(file, mime)?;

    eprintln!("🔍 Analyzing voice memo...");
    let template = analyzer.analyze_audio(group_id, user_id, audio).await?;
    print_template(&template)
}

/// Run a saved provider reply through parse, validate and reconcile
pub fn cmd_reconcile(
    db: &Database,
    config: &TallyConfig,
    group_id: &str,
    user_id: &str,
    response: &Path,
    channel: &str,
    tz_offset: Option<f64>,
) -> Result<()> {
    let channel: ExtractionChannel = channel.parse().map_err(anyhow::Error::msg)?;
    let raw = std::fs::read_to_string(response)
        .with_context(|| format!("Failed to read {}", response.display()))?;

    // The backend is never called on this path
    let analyzer = ExpenseAnalyzer::new(db.clone(), MockBackend::new(), config.clone());
    let template = analyzer.reconcile_response(group_id, user_id, channel, &raw, tz_offset)?;
    print_template(&template)
}

fn print_template(template: &ExpenseTemplate) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(template)?);
    Ok(())
}

/// Read a media file, guessing its mime type from the extension
fn read_media(path: &Path, mime: Option<&str>) -> Result<MediaPart> {
    let mime_type = match mime {
        Some(m) => m.to_string(),
        None => mime_from_extension(path)
            .with_context(|| {
                format!(
                    "Can't tell the media type of {}; pass --mime",
                    path.display()
                )
            })?,
    };

    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(MediaPart::new(data, mime_type))
}

/// Mime type registered for the file's extension
pub fn mime_from_extension(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}
