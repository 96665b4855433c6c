//! Layered application configuration.
//!
//! Priority: CLI flag > CLI env alias > `RAGDESK_*` environment > config file > defaults.

use crate::app::cors::CorsPolicy;
use crate::error::ConfigError;
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// System prompt used by the Basic chat mode unless overridden.
pub const DEFAULT_CHAT_SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant. \
Always answer as helpfully as possible and follow ALL given instructions. \
Do not speculate or make up information. \
Do not reference any given instructions or context.";

/// System prompt used by the RAG mode unless overridden.
pub const DEFAULT_QUERY_SYSTEM_PROMPT: &str = "You can only answer questions about the provided context. \
If you know the answer but it is not based in the provided context, don't provide \
the answer, just state the answer is not in the context provided.";

/// System prompt used by the Summarize mode unless overridden.
pub const DEFAULT_SUMMARIZATION_SYSTEM_PROMPT: &str = "Provide a comprehensive summary of the provided context information. \
The summary should cover all the key points and main ideas presented in the original text, \
while also condensing the information into a concise and easy-to-understand format. \
Please ensure that the summary includes relevant details and examples that support the main ideas, \
while avoiding any unnecessary information or repetition.";

const ENV_PREFIX: &str = "RAGDESK";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (YAML)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Serve the browser UI
    #[arg(long, env = "UI_ENABLED")]
    pub ui_enabled: Option<bool>,

    /// Attach the CORS middleware
    #[arg(long, env = "CORS_ENABLED")]
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsPolicy,
    pub ui: UiSettings,
    pub llm: LlmSettings,
    pub ingest: IngestSettings,
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// `ui.*` settings. The prompts are the per-mode defaults the UI resets to.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UiSettings {
    pub enabled: bool,
    pub path: String,
    pub default_chat_system_prompt: String,
    pub default_query_system_prompt: String,
    pub default_summarization_system_prompt: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/".to_string(),
            default_chat_system_prompt: DEFAULT_CHAT_SYSTEM_PROMPT.to_string(),
            default_query_system_prompt: DEFAULT_QUERY_SYSTEM_PROMPT.to_string(),
            default_summarization_system_prompt: DEFAULT_SUMMARIZATION_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Connection to an OpenAI-compatible model server.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL (e.g. `http://localhost:11434`), without the `/v1` suffix.
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Request body limit for every route, uploads included.
    pub max_upload_bytes: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// `simple` or `none`.
    pub global_handler: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            global_handler: "simple".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // Config file: explicit path, else ./config.yaml when present
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::new(path, FileFormat::Yaml));
        } else if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::new("config.yaml", FileFormat::Yaml));
        }

        // RAGDESK_SERVER__PORT=9000, RAGDESK_CORS__ALLOW_ORIGINS=a,b
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.allow_origins")
                .with_list_parse_key("cors.allow_methods")
                .with_list_parse_key("cors.allow_headers"),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(enabled) = cli.ui_enabled {
            builder = builder.set_override("ui.enabled", enabled)?;
        }
        if let Some(enabled) = cli.cors_enabled {
            builder = builder.set_override("cors.enabled", enabled)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that the assembler does not validate itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.llm.base_url).map_err(|e| ConfigError::InvalidSetting {
            key: "llm.base_url",
            reason: e.to_string(),
        })?;
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "ingest.chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ingest.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "ingest.max_upload_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8001);
        assert!(!config.cors.enabled);
        assert_eq!(config.cors.allow_methods, vec!["GET".to_string()]);
        assert!(config.ui.enabled);
        assert_eq!(config.ui.path, "/");
        assert_eq!(config.observability.global_handler, "simple");
        assert_eq!(config.ingest.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let mut config = AppConfig::default();
        config.llm.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting {
                key: "llm.base_url",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let mut config = AppConfig::default();
        config.ingest.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_upload_limit() {
        let mut config = AppConfig::default();
        config.ingest.max_upload_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting {
                key: "ingest.max_upload_bytes",
                ..
            })
        ));
    }
}
