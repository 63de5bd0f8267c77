use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::vocabulary::Vocabulary;

const APP_DIR: &str = "jachtexamen-blog";

/// Secrets and paths, read from the environment.
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub data_dir: PathBuf,
    pub settings_path: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("data_dir", &self.data_dir)
            .field("settings_path", &self.settings_path)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::try_load_dotenv();

        let data_dir = match non_empty_var("BLOG_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .ok_or_else(|| {
                    ConfigError::Missing(
                        "Could not determine local data directory; set BLOG_DATA_DIR".to_string(),
                    )
                })?
                .join(APP_DIR),
        };

        let settings_path = non_empty_var("BLOG_SETTINGS").map(PathBuf::from).or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join(APP_DIR).join("settings.toml"))
                .filter(|path| path.exists())
        });

        Ok(Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            data_dir,
            settings_path,
        })
    }

    /// Both provider keys, or an error explaining how to configure them.
    pub fn provider_keys(&self) -> Result<(String, String), ConfigError> {
        let hint = format!(
            "\n\nTo fix this, create ~/.config/{}/.env with:\n  \
            OPENAI_API_KEY=your_key_here\n  \
            ANTHROPIC_API_KEY=your_key_here",
            APP_DIR
        );
        let openai = self
            .openai_api_key
            .clone()
            .ok_or_else(|| ConfigError::Missing(format!("OPENAI_API_KEY not found.{}", hint)))?;
        let anthropic = self
            .anthropic_api_key
            .clone()
            .ok_or_else(|| ConfigError::Missing(format!("ANTHROPIC_API_KEY not found.{}", hint)))?;
        Ok((openai, anthropic))
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        match &self.settings_path {
            Some(path) => Settings::load(path),
            None => Ok(Settings::default()),
        }
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/jachtexamen-blog/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Tunables. Every field has a default, so any subset may be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vocabulary: Vocabulary,
    pub qa: QaSettings,
    pub providers: ProviderSettings,
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Missing or empty file yields defaults; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    pub min_words: usize,
    pub max_words: usize,
    pub min_paragraphs: usize,
    pub keyword_density_min: f64,
    pub keyword_density_max: f64,
    /// Function words of the language articles must be written in.
    pub target_language_words: Vec<String>,
    /// Function words of the language articles must not drift into.
    pub disallowed_language_words: Vec<String>,
    /// Share of `target_language_words` that must occur at least once.
    pub min_target_presence: f64,
    /// Disallowed-word tokens allowed per target-word token.
    pub max_disallowed_ratio: f64,
}

impl Default for QaSettings {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            min_words: 500,
            max_words: 3000,
            min_paragraphs: 4,
            keyword_density_min: 0.005,
            keyword_density_max: 0.03,
            target_language_words: words(&[
                "de", "het", "een", "van", "en", "in", "is", "op", "te", "voor", "met", "dat",
                "niet", "zijn",
            ]),
            disallowed_language_words: words(&[
                "the", "and", "of", "to", "with", "that", "this", "for", "are", "was", "you",
            ]),
            min_target_presence: 0.3,
            max_disallowed_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub openai_model: String,
    pub openai_base_url: String,
    pub claude_model: String,
    pub claude_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Upper bound for a single provider call, including the HTTP round trip.
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_model: "gpt-4-turbo-preview".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            claude_model: "claude-3-5-sonnet-20241022".to_string(),
            claude_base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2500,
            temperature: 0.7,
            top_p: 0.9,
            frequency_penalty: 0.3,
            presence_penalty: 0.3,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub regenerate_on_qa_failure: bool,
    /// Total generation attempts per run when regeneration is enabled.
    pub max_regeneration_attempts: u32,
    pub request_meta_description: bool,
    /// Ask the generating provider for multiple-choice exam questions.
    pub generate_exam_questions: bool,
    pub words_per_minute: usize,
    /// Characters before the ellipsis, capped at 160.
    pub excerpt_length: usize,
    pub language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            regenerate_on_qa_failure: false,
            max_regeneration_attempts: 2,
            request_meta_description: false,
            generate_exam_questions: false,
            words_per_minute: 250,
            excerpt_length: 160,
            language: "nl-NL".to_string(),
        }
    }
}
