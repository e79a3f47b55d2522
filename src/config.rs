//! Environment-driven configuration for the relay server.

use thiserror::Error;
use url::Url;

/// Environment variable for the service port.
const PORT_ENV: &str = "FINCHAT_PORT";
/// Environment variable for the allowed frontend origin (CORS).
const FRONTEND_ORIGIN_ENV: &str = "FINCHAT_FRONTEND_ORIGIN";
/// Environment variable for the assistant service API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable for a custom assistant service base URL.
const BASE_URL_ENV: &str = "FINCHAT_OPENAI_URL";
/// Environment variable for the model name.
const MODEL_ENV: &str = "FINCHAT_MODEL";
/// Environment variable overriding the system prompt.
const SYSTEM_PROMPT_ENV: &str = "FINCHAT_SYSTEM_PROMPT";

/// Default service port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default assistant service base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
/// Default model name.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default system prompt, matching the deployed financial-analyst assistant.
const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert financial analyst. \
Use your knowledge base to answer questions about audited financial statements.";

/// Configuration errors that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is absent.
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
    /// Assistant base URL did not parse.
    #[error("invalid assistant base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Settings for the assistant service client.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// API key sent as bearer auth.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible service, without trailing slash.
    pub base_url: String,
    /// Model name submitted with every request.
    pub model: String,
    /// System prompt prepended to every context window.
    pub system_prompt: String,
}

/// Top-level server configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Exact origin allowed by CORS; `None` means permissive.
    pub frontend_origin: Option<String>,
    /// Assistant client settings.
    pub assistant: AssistantConfig,
}

impl RelayConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or the base URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingEnv(API_KEY_ENV))?;

        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        // Validate early so a bad URL fails at startup, not on first message.
        let parsed = Url::parse(&base_url)?;
        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        let model = std::env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let system_prompt = std::env::var(SYSTEM_PROMPT_ENV)
            .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            port: get_port(),
            frontend_origin: std::env::var(FRONTEND_ORIGIN_ENV).ok(),
            assistant: AssistantConfig {
                api_key,
                base_url,
                model,
                system_prompt,
            },
        })
    }
}

/// Get the configured server port, falling back to the default.
#[must_use]
pub fn get_port() -> u16 {
    std::env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}
