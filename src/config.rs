use std::{env, path::PathBuf};

use crate::llm::parse_model_provider;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CHAT_MODEL: &str = "gemini/gemini-1.5-flash";
const DEFAULT_SUMMARY_MODEL: &str = "openai/gpt-4o";
const DEFAULT_FLASHCARD_MODEL: &str = "openai/gpt-4";

/// Failure while reading settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials and endpoints for the two upstream providers.
#[derive(Clone, Debug, Default)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
}

/// Provider-prefixed model names used by each gateway.
#[derive(Clone, Debug)]
pub struct GatewayModels {
    pub chat: String,
    pub summary: String,
    pub flashcards: String,
}

impl Default for GatewayModels {
    fn default() -> Self {
        Self {
            chat: DEFAULT_CHAT_MODEL.to_string(),
            summary: DEFAULT_SUMMARY_MODEL.to_string(),
            flashcards: DEFAULT_FLASHCARD_MODEL.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub providers: ProviderSettings,
    pub models: GatewayModels,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            providers: ProviderSettings {
                openai_api_key: None,
                openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                gemini_api_key: None,
                gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            },
            models: GatewayModels::default(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_or("PORT", &lookup, defaults.port)?;
        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", &lookup, defaults.max_upload_bytes)?;
        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let providers = ProviderSettings {
            openai_api_key: non_empty(lookup("OPENAI_API_KEY")),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or(defaults.providers.openai_base_url),
            gemini_api_key: non_empty(lookup("GEMINI_API_KEY")),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or(defaults.providers.gemini_base_url),
        };

        let models = GatewayModels {
            chat: model_or("CHAT_MODEL", &lookup, defaults.models.chat)?,
            summary: model_or("SUMMARY_MODEL", &lookup, defaults.models.summary)?,
            flashcards: model_or("FLASHCARD_MODEL", &lookup, defaults.models.flashcards)?,
        };

        Ok(Self {
            port,
            upload_dir,
            max_upload_bytes,
            providers,
            models,
        })
    }
}

fn parse_or<T>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::InvalidValue(key.to_string(), err.to_string())),
        None => Ok(default),
    }
}

fn model_or(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: String,
) -> Result<String, ConfigError> {
    let model = lookup(key).unwrap_or(default);
    parse_model_provider(&model)
        .map_err(|err| ConfigError::InvalidValue(key.to_string(), err.to_string()))?;
    Ok(model)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
