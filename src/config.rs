//! Runtime configuration.
//!
//! Resolution order, later wins: built-in defaults, `config.toml` in the
//! Clarity home, environment variables, then CLI flags applied through the
//! `with_*` builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{ClarityError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TRANSCRIBE_MODEL: &str = "whisper-1";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigToml {
    model: Option<String>,
    transcribe_model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    bind: Option<String>,
    data_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

/// Configuration for the Clarity store, server and AI backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarityConfig {
    /// Directory holding `config.toml`
    pub home: PathBuf,

    /// Directory holding the persisted snapshot
    pub data_dir: PathBuf,

    /// Address the HTTP proxy listens on
    pub bind: String,

    pub model: String,

    pub transcribe_model: String,

    /// OpenAI-compatible API root, without a trailing slash
    pub base_url: String,

    /// When absent the AI proxy answers with setup guidance
    pub api_key: Option<String>,

    pub request_timeout: Duration,
}

impl ClarityConfig {
    pub fn new(home: PathBuf) -> Self {
        Self {
            data_dir: home.clone(),
            home,
            bind: DEFAULT_BIND.to_string(),
            model: DEFAULT_MODEL.to_string(),
            transcribe_model: DEFAULT_TRANSCRIBE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Defaults, then `config.toml`, then the process environment.
    pub async fn load(home: PathBuf) -> Result<Self> {
        let file = home.join(CONFIG_FILE);
        let mut config = Self::new(home);
        if tokio::fs::try_exists(&file).await? {
            let content = tokio::fs::read_to_string(&file).await?;
            config = config.merge_toml(&content, &file)?;
        }
        Ok(config.with_env())
    }

    fn merge_toml(mut self, content: &str, file: &Path) -> Result<Self> {
        let parsed: ConfigToml = toml::from_str(content)
            .map_err(|e| ClarityError::Config(format!("{}: {}", file.display(), e)))?;
        debug!("Loaded config from {}", file.display());

        if let Some(model) = parsed.model {
            self.model = model;
        }
        if let Some(model) = parsed.transcribe_model {
            self.transcribe_model = model;
        }
        if let Some(url) = parsed.base_url {
            self = self.with_base_url(url);
        }
        if let Some(key) = parsed.api_key {
            self = self.with_api_key(Some(key));
        }
        if let Some(bind) = parsed.bind {
            self.bind = bind;
        }
        if let Some(dir) = parsed.data_dir {
            self.data_dir = if dir.is_relative() {
                self.home.join(dir)
            } else {
                dir
            };
        }
        if let Some(secs) = parsed.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    pub fn with_env(self) -> Self {
        self.with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("CLARITY_MODEL") {
            self.model = model;
        }
        if let Some(model) = get("CLARITY_TRANSCRIBE_MODEL") {
            self.transcribe_model = model;
        }
        if let Some(url) = get("CLARITY_BASE_URL") {
            self = self.with_base_url(url);
        }
        // CLARITY_API_KEY beats the generic OpenAI variable
        if let Some(key) = get("CLARITY_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self = self.with_api_key(Some(key));
        }
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn ai_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Clarity home: explicit override, then `CLARITY_HOME`, then `~/.clarity`.
pub fn resolve_home(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = explicit {
        return Ok(home);
    }
    if let Ok(home) = std::env::var("CLARITY_HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| ClarityError::Config("could not find home directory".to_string()))?;
    Ok(home.join(".clarity"))
}
