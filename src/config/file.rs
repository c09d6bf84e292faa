//! TOML configuration file loading
//!
//! Supports `~/.config/pokerlog/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PokerlogConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub database: DatabaseFileConfig,

    /// Language-model provider
    #[serde(default)]
    pub openai: OpenAiFileConfig,

    /// `WhatsApp` gateway
    #[serde(default)]
    pub whatsapp: WhatsAppFileConfig,

    /// Message pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,

    /// Bearer token the gateway must present on webhook calls
    pub webhook_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<String>,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiFileConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub chat_model: Option<String>,
    pub vision_model: Option<String>,
    pub transcription_model: Option<String>,
    pub transcription_language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppFileConfig {
    pub api_url: Option<String>,
    pub instance_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PipelineFileConfig {
    pub country_code: Option<String>,
    pub call_timeout_secs: Option<u64>,
    pub dispatch_retries: Option<u32>,
    pub training_window_minutes: Option<u64>,
    pub tournament_lookahead_days: Option<u32>,
    pub inline_images: Option<bool>,
}

/// Load the TOML config file from `path`, or the standard path
///
/// Returns `PokerlogConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file(path: Option<&Path>) -> PokerlogConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return PokerlogConfigFile::default();
    };

    if !path.exists() {
        return PokerlogConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PokerlogConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PokerlogConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is invalid or has unknown sections
pub fn parse(content: &str) -> crate::Result<PokerlogConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/pokerlog/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("pokerlog").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let fc = parse(
            r#"
            [server]
            port = 9000

            [pipeline]
            dispatch_retries = 2
            inline_images = true
            "#,
        )
        .unwrap();

        assert_eq!(fc.server.port, Some(9000));
        assert_eq!(fc.pipeline.dispatch_retries, Some(2));
        assert_eq!(fc.pipeline.inline_images, Some(true));
        assert!(fc.openai.api_key.is_none());
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse("[telegram]\ntoken = \"x\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file(Some(&dir.path().join("absent.toml")));
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn reads_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[whatsapp]\ninstance_id = \"1101\"\n").unwrap();

        let fc = load_config_file(Some(&path));
        assert_eq!(fc.whatsapp.instance_id.as_deref(), Some("1101"));
    }
}
