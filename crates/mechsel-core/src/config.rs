use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

// --- Service configuration ---

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Where motor records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    File(PathBuf),
    Http(String),
}

impl CatalogLocation {
    /// `http://` and `https://` strings name a remote catalog service,
    /// anything else is a file path.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            CatalogLocation::Http(s.to_string())
        } else {
            CatalogLocation::File(PathBuf::from(s))
        }
    }
}

impl FromStr for CatalogLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for CatalogLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogLocation::File(path) => write!(f, "{}", path.display()),
            CatalogLocation::Http(url) => f.write_str(url),
        }
    }
}

/// Everything the server reads from its environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ai: AiSettings,
    pub catalog: CatalogLocation,
    /// Reference material table image for the material task
    pub image_url: Option<String>,
    pub port: u16,
    pub model_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub candidate_limit: usize,
    pub upload_limit_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let ai = AiSettings {
            provider: var("AI_PROVIDER").unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_key: var("GEMINI_API_KEY")
                .or_else(|| var("AI_API_KEY"))
                .unwrap_or_default(),
            model: var("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        let catalog = match var("CATALOG_URI") {
            Some(uri) => CatalogLocation::parse(&uri),
            None => CatalogLocation::File(crate::default_catalog_path()),
        };

        Ok(Self {
            ai,
            catalog,
            image_url: var("IMAGE_URL"),
            port: number(&var, "PORT", DEFAULT_PORT)?,
            model_timeout_secs: number(&var, "MODEL_TIMEOUT_SECS", DEFAULT_MODEL_TIMEOUT_SECS)?,
            http_timeout_secs: number(&var, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            candidate_limit: number(&var, "CANDIDATE_LIMIT", DEFAULT_CANDIDATE_LIMIT)?,
            upload_limit_bytes: number(&var, "UPLOAD_LIMIT_BYTES", DEFAULT_UPLOAD_LIMIT_BYTES)?,
        })
    }
}

fn number<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(n) if n != T::default() => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value: raw }),
        },
    }
}
