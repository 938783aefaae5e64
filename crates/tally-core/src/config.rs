//! Tally configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir (~/.local/share/tally/config.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override file keep their embedded defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::ai::ExtractionChannel;
use crate::error::{Error, Result};
use crate::prompts::PromptLibrary;
use crate::validation::ValidationPolicy;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Validation policy per extraction channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    pub audio: ValidationPolicy,
    pub images: ValidationPolicy,
    pub text: ValidationPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            audio: ValidationPolicy::Strict,
            images: ValidationPolicy::Strict,
            text: ValidationPolicy::Structural,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct TallyConfig {
    pub validation: ValidationConfig,
    /// Timeout for a single provider call
    pub provider_timeout: Duration,
    /// Prompt override directory (None = platform default)
    pub prompt_override_dir: Option<PathBuf>,
    /// File the config was read from (None = embedded defaults)
    pub source: Option<PathBuf>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            provider_timeout: Duration::from_secs(60),
            prompt_override_dir: None,
            source: None,
        }
    }
}

impl TallyConfig {
    /// Load config from an explicit path or the default locations
    ///
    /// An explicit path must exist; the data dir override is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(path) if !path.exists() => {
                return Err(Error::NotFound(format!(
                    "config file {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = parse_config(DEFAULT_CONFIG)?;

        if let Some(ref path) = source {
            debug!(path = %path.display(), "Loading config override");
            let content = fs::read_to_string(path)
                .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?;
            apply(&mut config, toml::from_str(&content)?);
            config.source = source;
        }

        Ok(config)
    }

    /// Validation policy for a channel
    pub fn policy_for(&self, channel: ExtractionChannel) -> ValidationPolicy {
        match channel {
            ExtractionChannel::Audio => self.validation.audio,
            ExtractionChannel::Images => self.validation.images,
            ExtractionChannel::Text => self.validation.text,
        }
    }

    /// Prompt library honoring the configured override directory
    pub fn prompt_library(&self) -> PromptLibrary {
        match &self.prompt_override_dir {
            Some(dir) => PromptLibrary::with_override_dir(dir.clone()),
            None => PromptLibrary::new(),
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    validation: Option<RawValidation>,
    provider: Option<RawProvider>,
    prompts: Option<RawPrompts>,
}

#[derive(Debug, Deserialize)]
struct RawValidation {
    audio: Option<ValidationPolicy>,
    images: Option<ValidationPolicy>,
    text: Option<ValidationPolicy>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawPrompts {
    override_dir: Option<PathBuf>,
}

fn parse_config(content: &str) -> Result<TallyConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = TallyConfig::default();
    apply(&mut config, raw);
    Ok(config)
}

fn apply(config: &mut TallyConfig, raw: RawConfig) {
    if let Some(validation) = raw.validation {
        if let Some(policy) = validation.audio {
            config.validation.audio = policy;
        }
        if let Some(policy) = validation.images {
            config.validation.images = policy;
        }
        if let Some(policy) = validation.text {
            config.validation.text = policy;
        }
    }

    if let Some(timeout) = raw.provider.and_then(|p| p.timeout_secs) {
        config.provider_timeout = Duration::from_secs(timeout);
    }

    if let Some(dir) = raw.prompts.and_then(|p| p.override_dir) {
        config.prompt_override_dir = Some(dir);
    }
}
