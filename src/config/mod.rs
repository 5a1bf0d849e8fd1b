//! Configuration (layered: code > env > defaults).

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{IntakeError, Result};

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<IntakeConfig> = OnceLock::new();

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-transcribe";
pub const DEFAULT_PROMPTS_DIR: &str = "assets/prompts";
pub const DEFAULT_AUDIO_DIR: &str = "assets/audio";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TURNS: u32 = 10;

/// Runtime configuration for the capability clients and resource loaders.
#[derive(Clone)]
pub struct IntakeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub transcription_model: String,
    pub prompts_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub request_timeout: Duration,
    /// Upper bound on model round-trips inside one agent turn.
    pub max_agent_turns: u32,
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("transcription_model", &self.transcription_model)
            .field("prompts_dir", &self.prompts_dir)
            .field("audio_dir", &self.audio_dir)
            .field("request_timeout", &self.request_timeout)
            .field("max_agent_turns", &self.max_agent_turns)
            .finish()
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            prompts_dir: PathBuf::from(DEFAULT_PROMPTS_DIR),
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            request_timeout: DEFAULT_TIMEOUT,
            max_agent_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl IntakeConfig {
    /// Load from environment variables, reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(model) = lookup("OPENAI_TRANSCRIPTION_MODEL") {
            config.transcription_model = model;
        }
        if let Some(dir) = lookup("TELEPATIA_PROMPTS_DIR") {
            config.prompts_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("TELEPATIA_AUDIO_DIR") {
            config.audio_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("TELEPATIA_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("TELEPATIA_TIMEOUT_SECS", &secs)?);
        }
        if let Some(turns) = lookup("TELEPATIA_MAX_TURNS") {
            config.max_agent_turns = parse_number("TELEPATIA_MAX_TURNS", &turns)?;
        }

        Ok(config)
    }

    /// Get (or create) the global default config.
    ///
    /// Falls back to defaults when the environment holds malformed values.
    pub fn global() -> &'static IntakeConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            Self::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring invalid environment configuration");
                Self::default()
            })
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = dir.into();
        self
    }

    pub fn with_audio_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audio_dir = dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_agent_turns(mut self, turns: u32) -> Self {
        self.max_agent_turns = turns;
        self
    }

    /// Resolve the API key or fail with an authentication error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| IntakeError::Authentication("Missing OPENAI_API_KEY".into()))
    }
}

fn parse_number<T: std::str::FromStr + PartialOrd + Default>(var: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .ok()
        .filter(|value| *value > T::default())
        .ok_or_else(|| IntakeError::Configuration(format!("{var} must be a positive integer, got '{raw}'")))
}
