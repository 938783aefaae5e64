//! Prompt library for AI extraction
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in the override dir (~/.local/share/tally/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Templates use `{{members}}`, `{{categories}}` and `{{today}}`, filled in from
//! the reconciliation context by [`build_prompt`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::ai::ExtractionChannel;
use crate::error::{Error, Result};
use crate::models::ReconciliationContext;
use crate::reconcile::shift_by_offset;

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const ANALYZE_IMAGES: &str = include_str!("../../../prompts/analyze_images.md");
    pub const ANALYZE_TEXT: &str = include_str!("../../../prompts/analyze_text.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Receipt photos
    AnalyzeImages,
    /// Typed descriptions and audio transcripts
    AnalyzeText,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeImages => "analyze_images",
            Self::AnalyzeText => "analyze_text",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::AnalyzeImages, Self::AnalyzeText]
    }

    /// The prompt used for an extraction channel
    pub fn for_channel(channel: ExtractionChannel) -> Self {
        match channel {
            ExtractionChannel::Images => Self::AnalyzeImages,
            ExtractionChannel::Audio | ExtractionChannel::Text => Self::AnalyzeText,
        }
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::AnalyzeImages => defaults::ANALYZE_IMAGES,
            Self::AnalyzeText => defaults::ANALYZE_TEXT,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown prompt: {}", s))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Template body (frontmatter stripped)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Render the prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        let mut result = self.content.clone();

        // Simple mustache-style replacement: {{var}}
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }

        result
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        match self.cache.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let prompt = load(self.override_dir.as_deref(), id)?;
                Ok(entry.insert(prompt))
            }
        }
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let override_path = self.override_path(id);
                let version = self.get(id).map(|p| p.metadata.version).unwrap_or(0);
                PromptInfo {
                    id: id.as_str().to_string(),
                    version,
                    has_override: override_path.is_some(),
                    override_path,
                }
            })
            .collect()
    }

    /// Path of an existing override file for a prompt
    pub fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", id.as_str())))
            .filter(|path| path.exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("prompts").join("overrides"))
}

/// Load a prompt (checking override first, then default)
fn load(override_dir: Option<&Path>, id: PromptId) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let override_path = dir.join(format!("{}.md", id.as_str()));
        if override_path.exists() {
            let content = fs::read_to_string(&override_path).map_err(|e| {
                Error::InvalidData(format!("Failed to read prompt override: {}", e))
            })?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(override_path),
            });
        }
    }

    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Template variables derived from the context
///
/// `today` is `now` shifted by the caller's timezone offset so relative dates
/// ("ayer") resolve against the user's calendar day.
pub fn prompt_vars(
    ctx: &ReconciliationContext,
    now: DateTime<Utc>,
) -> HashMap<&'static str, String> {
    let members = ctx.member_names().join(", ");
    let categories = ctx
        .categories
        .iter()
        .map(|c| format!("{} (id: {})", c.name, c.category_id))
        .collect::<Vec<_>>()
        .join(", ");
    let today = shift_by_offset(now, ctx.timezone_offset_hours)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    HashMap::from([
        ("members", members),
        ("categories", categories),
        ("today", today),
    ])
}

/// Render the extraction prompt for a channel
pub fn build_prompt(
    library: &mut PromptLibrary,
    channel: ExtractionChannel,
    ctx: &ReconciliationContext,
    now: DateTime<Utc>,
) -> Result<String> {
    let prompt = library.get(PromptId::for_channel(channel))?;
    Ok(prompt.render(&prompt_vars(ctx, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContextCategory, ContextMember, SplitPolicy};
    use tempfile::TempDir;

    fn context(offset: Option<f64>) -> ReconciliationContext {
        ReconciliationContext {
            members: vec![
                ContextMember {
                    member_id: "m1".into(),
                    display_name: "Ana".into(),
                    default_split_percent: None,
                },
                ContextMember {
                    member_id: "m2".into(),
                    display_name: "Beto".into(),
                    default_split_percent: None,
                },
            ],
            categories: vec![
                ContextCategory {
                    category_id: "c1".into(),
                    name: "Comida".into(),
                },
                ContextCategory {
                    category_id: "c2".into(),
                    name: "Hogar".into(),
                },
            ],
            split_policy: SplitPolicy::Equal,
            requesting_member_id: "m1".into(),
            timezone_offset_hours: offset,
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T02:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 3
---

Members: {{members}}
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 3);
        assert_eq!(body, "Members: {{members}}");
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("just a body").is_err());
        assert!(parse_prompt("---\nid: x\nversion: 1\n").is_err());
        assert!(parse_prompt("---\nversion: 1\n---\nbody").is_err());
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let (metadata, body) = parse_prompt(id.default_content()).unwrap();
            assert_eq!(metadata.id, id.as_str(), "Prompt ID mismatch");
            assert!(body.contains("{{members}}"));
            assert!(body.contains("{{categories}}"));
            assert!(body.contains("{{today}}"));
            assert!(body.contains("detectedCategoryAmounts"));
        }
    }

    #[test]
    fn test_image_prompt_carries_unreadable_instruction() {
        let (_, body) = parse_prompt(PromptId::AnalyzeImages.default_content()).unwrap();
        assert!(body.contains(r#""error": "unreadable""#));
    }

    #[test]
    fn test_prompt_for_channel() {
        assert_eq!(
            PromptId::for_channel(ExtractionChannel::Images),
            PromptId::AnalyzeImages
        );
        assert_eq!(
            PromptId::for_channel(ExtractionChannel::Audio),
            PromptId::AnalyzeText
        );
        assert_eq!(
            PromptId::for_channel(ExtractionChannel::Text),
            PromptId::AnalyzeText
        );
    }

    #[test]
    fn test_prompt_id_from_str() {
        assert_eq!(
            "analyze_text".parse::<PromptId>().unwrap(),
            PromptId::AnalyzeText
        );
        assert!("parse_receipt".parse::<PromptId>().is_err());
    }

    #[test]
    fn test_prompt_vars() {
        let vars = prompt_vars(&context(None), now());
        assert_eq!(vars["members"], "Ana, Beto");
        assert_eq!(vars["categories"], "Comida (id: c1), Hogar (id: c2)");
        assert_eq!(vars["today"], "2024-06-01T02:00:00.000Z");
    }

    #[test]
    fn test_today_shifted_by_offset() {
        let vars = prompt_vars(&context(Some(-3.0)), now());
        assert_eq!(vars["today"], "2024-05-31T23:00:00.000Z");
    }

    #[test]
    fn test_build_prompt_fills_placeholders() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt =
            build_prompt(&mut lib, ExtractionChannel::Text, &context(None), now()).unwrap();
        assert!(prompt.contains("Available group members: Ana, Beto"));
        assert!(prompt.contains("Comida (id: c1)"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("analyze_text.md"),
            "---\nid: analyze_text\nversion: 7\n---\nCustom for {{members}}",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let prompt = lib.get(PromptId::AnalyzeText).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 7);

        let images = lib.get(PromptId::AnalyzeImages).unwrap();
        assert!(!images.is_override);

        let rendered =
            build_prompt(&mut lib, ExtractionChannel::Audio, &context(None), now()).unwrap();
        assert_eq!(rendered, "Custom for Ana, Beto");

        let infos = lib.list();
        assert_eq!(infos.len(), 2);
        let text_info = infos.iter().find(|i| i.id == "analyze_text").unwrap();
        assert!(text_info.has_override);
        assert_eq!(text_info.version, 7);
    }

    #[test]
    fn test_embedded_only_library() {
        let mut lib = PromptLibrary::embedded_only();
        assert!(lib.override_dir().is_none());
        for info in lib.list() {
            assert!(!info.has_override);
            assert_eq!(info.version, 1);
        }
    }
}
