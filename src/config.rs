use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use crate::chatbot::gemini::DEFAULT_MODEL;
use crate::chatbot::tts::DEFAULT_TTS_ENDPOINT;
use crate::chatbot::{EmptyDoubtPolicy, HandlerConfig, IntakeMode};

/// Admin chat used when neither the file nor `ADMIN_ID` names one.
pub const DEFAULT_ADMIN_CHAT_ID: i64 = 6138277581;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// An environment variable holds an unusable value.
    Env { var: &'static str, value: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Env { var, value } => write!(f, "invalid value for {}: '{}'", var, value),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Env { .. } | Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Chat that receives a copy of every answered doubt.
    admin_chat_id: Option<i64>,
    #[serde(default)]
    gemini_api_key: String,
    gemini_model: Option<String>,
    /// Public HTTPS URL Telegram should push updates to. Unset = long polling.
    webhook_url: Option<String>,
    /// Address for the liveness endpoint (and the webhook, when enabled).
    listen_addr: Option<String>,
    #[serde(default)]
    intake_mode: IntakeMode,
    #[serde(default)]
    empty_doubt_policy: EmptyDoubtPolicy,
    /// Base URL of the Google Translate TTS endpoint.
    tts_endpoint: Option<String>,
    /// Directory for logs and voice clips. Defaults to current directory.
    data_dir: Option<String>,
    generation_timeout_secs: Option<u64>,
    synthesis_timeout_secs: Option<u64>,
    send_timeout_secs: Option<u64>,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub admin_chat_id: i64,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub webhook_url: Option<Url>,
    pub listen_addr: SocketAddr,
    pub intake_mode: IntakeMode,
    pub empty_doubt_policy: EmptyDoubtPolicy,
    pub tts_endpoint: String,
    pub data_dir: PathBuf,
    pub generation_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub send_timeout: Duration,
}

impl Config {
    /// Load `path` (optional) and apply overrides from the process environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_sources(path, |var| std::env::var(var).ok())
    }

    /// Load `path` if it exists, then apply `BOT_TOKEN`, `ADMIN_ID`,
    /// `GEMINI_API_KEY`, `WEBHOOK_URL` and `PORT` from `env`.
    pub fn from_sources<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let mut file = match std::fs::read_to_string(&config_path) {
            Ok(content) => serde_json::from_str::<ConfigFile>(&content)
                .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => return Err(ConfigError::ReadFile { path: config_path, source: e }),
        };

        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        if let Some(token) = var("BOT_TOKEN") {
            file.telegram_bot_token = token;
        }
        if let Some(value) = var("ADMIN_ID") {
            let id = value
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::Env { var: "ADMIN_ID", value })?;
            file.admin_chat_id = Some(id);
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            file.gemini_api_key = key;
        }
        if let Some(url) = var("WEBHOOK_URL") {
            file.webhook_url = Some(url);
        }
        if let Some(value) = var("PORT") {
            let port = value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Env { var: "PORT", value })?;
            file.listen_addr = Some(format!("0.0.0.0:{port}"));
        }

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token (BOT_TOKEN) is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.gemini_api_key.is_empty() {
            return Err(ConfigError::Validation("gemini_api_key (GEMINI_API_KEY) is required".into()));
        }

        let webhook_url = match file.webhook_url {
            Some(raw) => {
                let url = Url::parse(&raw)
                    .map_err(|e| ConfigError::Validation(format!("webhook_url '{raw}' is invalid: {e}")))?;
                if url.scheme() != "https" {
                    return Err(ConfigError::Validation(format!("webhook_url '{raw}' must use https")));
                }
                // The root path is served by the liveness endpoint.
                if url.path() == "/" {
                    return Err(ConfigError::Validation(format!("webhook_url '{raw}' needs a path, e.g. /webhook")));
                }
                Some(url)
            }
            None => None,
        };

        let listen_addr = file.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Validation(format!("listen_addr '{listen_addr}' is invalid: {e}")))?;

        let generation_timeout = timeout("generation_timeout_secs", file.generation_timeout_secs, 30)?;
        let synthesis_timeout = timeout("synthesis_timeout_secs", file.synthesis_timeout_secs, 30)?;
        let send_timeout = timeout("send_timeout_secs", file.send_timeout_secs, 20)?;

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            admin_chat_id: file.admin_chat_id.unwrap_or(DEFAULT_ADMIN_CHAT_ID),
            gemini_api_key: file.gemini_api_key,
            gemini_model: file.gemini_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            webhook_url,
            listen_addr,
            intake_mode: file.intake_mode,
            empty_doubt_policy: file.empty_doubt_policy,
            tts_endpoint: file.tts_endpoint.unwrap_or_else(|| DEFAULT_TTS_ENDPOINT.to_string()),
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            generation_timeout,
            synthesis_timeout,
            send_timeout,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn voice_dir(&self) -> PathBuf {
        self.data_dir.join("voice")
    }

    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            admin_chat_id: self.admin_chat_id,
            intake_mode: self.intake_mode,
            empty_doubt_policy: self.empty_doubt_policy,
            send_timeout: self.send_timeout,
        }
    }
}

fn timeout(name: &str, secs: Option<u64>, default: u64) -> Result<Duration, ConfigError> {
    match secs.unwrap_or(default) {
        0 => Err(ConfigError::Validation(format!("{name} must be greater than zero"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}
