use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the AuroraMind RAG service.
///
/// Provider credentials are optional on purpose: the service starts without
/// them and degrades (ingestion records an error status, queries fall back to
/// the synthetic stream) instead of refusing to boot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret required on `/internal/*` routes. Empty disables the gate.
    pub service_token: String,
    /// Chat model used for streamed answer generation.
    pub openai_chat_model: String,
    /// Embedding model used for both ingestion and query embedding.
    pub openai_embed_model: String,
    /// OpenAI API key; absent means embedding/generation are unavailable.
    pub openai_api_key: Option<String>,
    /// Pinecone API key; absent means the vector index is unavailable.
    pub pinecone_api_key: Option<String>,
    /// Name of the Pinecone index holding document vectors.
    pub pinecone_index_name: String,
    /// Optional data-plane host override, skipping control-plane resolution.
    pub pinecone_index_host: Option<String>,
    /// HTTP server port.
    pub app_port: u16,
}

/// Port used when `APP_PORT` is not set.
pub const DEFAULT_APP_PORT: u16 = 9000;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            service_token: load_env_optional("SERVICE_TOKEN").unwrap_or_default(),
            openai_chat_model: load_env_optional("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|| "gpt-4.1-mini".to_string()),
            openai_embed_model: load_env_optional("OPENAI_EMBED_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            pinecone_api_key: load_env_optional("PINECONE_API_KEY"),
            pinecone_index_name: load_env_optional("PINECONE_INDEX_NAME")
                .unwrap_or_else(|| "kb-index".to_string()),
            pinecone_index_host: load_env_optional("PINECONE_INDEX_HOST"),
            app_port: load_env_optional("APP_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("APP_PORT".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_APP_PORT),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        index = %config.pinecone_index_name,
        chat_model = %config.openai_chat_model,
        embed_model = %config.openai_embed_model,
        port = config.app_port,
        token_gate = !config.service_token.is_empty(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Config, DEFAULT_APP_PORT};

    /// Baseline configuration for in-process tests that never touch the environment.
    pub(crate) fn test_config() -> Config {
        Config {
            service_token: String::new(),
            openai_chat_model: "gpt-4.1-mini".into(),
            openai_embed_model: "text-embedding-3-small".into(),
            openai_api_key: None,
            pinecone_api_key: None,
            pinecone_index_name: "kb-index".into(),
            pinecone_index_host: None,
            app_port: DEFAULT_APP_PORT,
        }
    }

    #[test]
    fn defaults_cover_missing_keys() {
        let config = test_config();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.pinecone_index_name, "kb-index");
        assert_eq!(config.app_port, 9000);
    }
}
