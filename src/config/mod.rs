//! Configuration management for the pokerlog gateway
//!
//! Values resolve with precedence env > TOML file > defaults.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use self::file::PokerlogConfigFile;
use crate::{Error, Result};

const DEFAULT_PORT: u16 = 18800;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_TRANSCRIPTION_LANGUAGE: &str = "he";
const DEFAULT_WHATSAPP_API_URL: &str = "https://api.green-api.com";
const DEFAULT_COUNTRY_CODE: &str = "972";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRAINING_WINDOW_MINUTES: u64 = 30;
const DEFAULT_TOURNAMENT_LOOKAHEAD_DAYS: u32 = 7;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,

    /// `SQLite` database file
    pub db_path: PathBuf,

    pub openai: OpenAiConfig,

    pub whatsapp: WhatsAppConfig,

    pub pipeline: PipelineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// When set, webhook calls must carry `Authorization: Bearer <token>`
    pub webhook_token: Option<SecretString>,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    /// Model for extraction, training and general answers
    pub chat_model: String,
    pub vision_model: String,
    pub transcription_model: String,
    /// ISO-639-1 hint passed to transcription
    pub transcription_language: String,
}

/// `WhatsApp` gateway configuration
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub instance_id: Option<String>,
    pub token: Option<SecretString>,
}

/// Message pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Calling code added to national numbers
    pub country_code: String,

    /// Deadline for every external call
    pub call_timeout: Duration,

    /// Extra send attempts on recoverable failures (0 = at-most-once)
    pub dispatch_retries: u32,

    /// How long an unanswered training scenario accepts an answer
    pub training_window: Duration,

    /// How far ahead open-ended tournament questions look
    pub tournament_lookahead_days: u32,

    /// Download images and send them inline to the vision model
    pub inline_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: DEFAULT_PORT,
                webhook_token: None,
            },
            db_path: default_db_path(),
            openai: OpenAiConfig {
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                api_key: None,
                chat_model: DEFAULT_CHAT_MODEL.to_string(),
                vision_model: DEFAULT_VISION_MODEL.to_string(),
                transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
                transcription_language: DEFAULT_TRANSCRIPTION_LANGUAGE.to_string(),
            },
            whatsapp: WhatsAppConfig {
                api_url: DEFAULT_WHATSAPP_API_URL.to_string(),
                instance_id: None,
                token: None,
            },
            pipeline: PipelineConfig {
                country_code: DEFAULT_COUNTRY_CODE.to_string(),
                call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
                dispatch_retries: 0,
                training_window: Duration::from_secs(DEFAULT_TRAINING_WINDOW_MINUTES * 60),
                tournament_lookahead_days: DEFAULT_TOURNAMENT_LOOKAHEAD_DAYS,
                inline_images: false,
            },
        }
    }
}

/// Parse an env value, ignoring unparsable input
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Default database location: `~/.local/share/pokerlog/pokerlog.db` on Linux
fn default_db_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("pokerlog.db"),
        |d| d.data_dir().join("pokerlog").join("pokerlog.db"),
    )
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value is invalid
    pub fn resolve<F>(fc: PokerlogConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            port: parsed(&lookup, "POKERLOG_PORT")
                .or_else(|| parsed(&lookup, "PORT"))
                .or(fc.server.port)
                .unwrap_or(defaults.server.port),
            webhook_token: lookup("POKERLOG_WEBHOOK_TOKEN")
                .or(fc.server.webhook_token)
                .map(SecretString::from),
        };

        let db_path = lookup("POKERLOG_DB_PATH")
            .or(fc.database.path)
            .map_or(defaults.db_path, PathBuf::from);

        let openai = OpenAiConfig {
            base_url: lookup("OPENAI_BASE_URL")
                .or(fc.openai.base_url)
                .unwrap_or(defaults.openai.base_url),
            api_key: lookup("OPENAI_API_KEY")
                .or(fc.openai.api_key)
                .map(SecretString::from),
            chat_model: lookup("POKERLOG_CHAT_MODEL")
                .or(fc.openai.chat_model)
                .unwrap_or(defaults.openai.chat_model),
            vision_model: lookup("POKERLOG_VISION_MODEL")
                .or(fc.openai.vision_model)
                .unwrap_or(defaults.openai.vision_model),
            transcription_model: lookup("POKERLOG_TRANSCRIPTION_MODEL")
                .or(fc.openai.transcription_model)
                .unwrap_or(defaults.openai.transcription_model),
            transcription_language: lookup("POKERLOG_TRANSCRIPTION_LANGUAGE")
                .or(fc.openai.transcription_language)
                .unwrap_or(defaults.openai.transcription_language),
        };

        let whatsapp = WhatsAppConfig {
            api_url: lookup("WHATSAPP_API_URL")
                .or(fc.whatsapp.api_url)
                .unwrap_or(defaults.whatsapp.api_url),
            instance_id: lookup("WHATSAPP_INSTANCE_ID").or(fc.whatsapp.instance_id),
            token: lookup("WHATSAPP_API_TOKEN")
                .or(fc.whatsapp.token)
                .map(SecretString::from),
        };

        let pipeline = PipelineConfig {
            country_code: lookup("POKERLOG_COUNTRY_CODE")
                .or(fc.pipeline.country_code)
                .map_or(defaults.pipeline.country_code, |c| {
                    c.trim().trim_start_matches('+').to_string()
                }),
            call_timeout: parsed(&lookup, "POKERLOG_CALL_TIMEOUT_SECS")
                .or(fc.pipeline.call_timeout_secs)
                .map_or(defaults.pipeline.call_timeout, Duration::from_secs),
            dispatch_retries: parsed(&lookup, "POKERLOG_DISPATCH_RETRIES")
                .or(fc.pipeline.dispatch_retries)
                .unwrap_or(defaults.pipeline.dispatch_retries),
            training_window: parsed(&lookup, "POKERLOG_TRAINING_WINDOW_MINUTES")
                .or(fc.pipeline.training_window_minutes)
                .map_or(defaults.pipeline.training_window, |m: u64| {
                    Duration::from_secs(m.saturating_mul(60))
                }),
            tournament_lookahead_days: parsed(&lookup, "POKERLOG_TOURNAMENT_LOOKAHEAD_DAYS")
                .or(fc.pipeline.tournament_lookahead_days)
                .unwrap_or(defaults.pipeline.tournament_lookahead_days),
            inline_images: parsed(&lookup, "POKERLOG_INLINE_IMAGES")
                .or(fc.pipeline.inline_images)
                .unwrap_or(defaults.pipeline.inline_images),
        };

        let config = Self {
            server,
            db_path,
            openai,
            whatsapp,
            pipeline,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let cc = &self.pipeline.country_code;
        if cc.is_empty() || !cc.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config(format!("country code must be digits, got {cc:?}")));
        }
        if self.pipeline.call_timeout.is_zero() {
            return Err(Error::Config("call timeout must be positive".to_string()));
        }
        url::Url::parse(&self.openai.base_url)
            .map_err(|e| Error::Config(format!("invalid OpenAI base URL: {e}")))?;
        url::Url::parse(&self.whatsapp.api_url)
            .map_err(|e| Error::Config(format!("invalid WhatsApp API URL: {e}")))?;
        Ok(())
    }

    /// OpenAI key, required to serve
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured
    pub fn require_openai_key(&self) -> Result<SecretString> {
        self.openai
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".to_string()))
    }

    /// `WhatsApp` instance and token, required to serve
    ///
    /// # Errors
    ///
    /// Returns error if either is missing
    pub fn require_whatsapp(&self) -> Result<(String, SecretString)> {
        match (&self.whatsapp.instance_id, &self.whatsapp.token) {
            (Some(instance), Some(token)) => Ok((instance.clone(), token.clone())),
            _ => Err(Error::Config(
                "WHATSAPP_INSTANCE_ID and WHATSAPP_API_TOKEN are required".to_string(),
            )),
        }
    }
}
