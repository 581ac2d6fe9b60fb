#[cfg(feature = "cli")]
use clap::Parser;
use url::Url;

use crate::adapters::{ClientOptions, Provider};
use crate::error::ProxyError;

/// Default system instruction prepended to every relayed conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Talk like a pirate.";

/// # Relay Configuration
///
/// Settings are read once at process start from command-line arguments,
/// environment variables and an optional `.env` file. The resulting value is
/// passed explicitly to the client factory and the server state.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "chat-relay"))]
#[cfg_attr(feature = "cli", command(about = "Relays chat completions from OpenAI or Ollama as Server-Sent Events"))]
#[cfg_attr(feature = "cli", command(version))]
pub struct Config {
    // =============================================================================
    // SERVER
    // =============================================================================

    /// Server port to listen on
    #[cfg_attr(feature = "cli", arg(short, long, env = "PORT", default_value = "8000"))]
    pub port: u16,

    /// Server host to bind to
    #[cfg_attr(feature = "cli", arg(long, env = "HOST", default_value = "0.0.0.0"))]
    pub host: String,

    /// Allowed CORS origins, comma separated
    #[cfg_attr(feature = "cli", arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:5173"))]
    pub cors_origins: String,

    // =============================================================================
    // CHAT PROVIDER
    // =============================================================================

    /// Chat provider (openai, ollama)
    #[cfg_attr(feature = "cli", arg(long, env = "CHAT_PROVIDER", default_value = "openai"))]
    pub provider: String,

    /// Model identifier; the provider default is used when unset
    #[cfg_attr(feature = "cli", arg(long, env = "CHAT_MODEL"))]
    pub model: Option<String>,

    /// System instruction sent ahead of every user message
    #[cfg_attr(feature = "cli", arg(long, env = "SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT))]
    pub system_prompt: String,

    /// OpenAI / Azure OpenAI API key
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_API_KEY", hide_env_values = true))]
    pub openai_api_key: Option<String>,

    /// OpenAI base URL, or the Azure resource endpoint when an API version is set
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_API_ENDPOINT"))]
    pub openai_api_endpoint: Option<String>,

    /// Azure OpenAI API version (e.g. 2024-06-01)
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_API_VERSION"))]
    pub openai_api_version: Option<String>,

    /// Base URL of the local Ollama server
    #[cfg_attr(feature = "cli", arg(long, env = "OLLAMA_HOST", default_value = crate::adapters::ollama::DEFAULT_HOST))]
    pub ollama_host: String,

    // =============================================================================
    // HTTP CLIENT AND LOGGING
    // =============================================================================

    /// Connect timeout for provider requests, in seconds
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_TIMEOUT", default_value = "10"))]
    pub http_client_timeout: u64,

    /// Log filter (error, warn, info, debug, trace or a tracing directive)
    #[cfg_attr(feature = "cli", arg(long, env = "RUST_LOG", default_value = "info"))]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from the command line and environment.
    ///
    /// Loads `.env` if present, initialises logging and validates the
    /// result. Invalid settings terminate the process with a message.
    #[cfg(feature = "cli")]
    pub fn parse_args() -> Self {
        let _ = dotenv::dotenv();

        let config = Self::parse();
        config.setup_logging();

        let field_names = "PORT, HOST, CORS_ORIGINS, CHAT_PROVIDER, CHAT_MODEL, SYSTEM_PROMPT, \
            OPENAI_API_KEY, OPENAI_API_ENDPOINT, OPENAI_API_VERSION, OLLAMA_HOST, \
            HTTP_CLIENT_TIMEOUT, RUST_LOG";
        tracing::info!("Loading environment variables: {}", field_names);

        if let Err(err) = config.validate() {
            eprintln!("Configuration validation failed: {}", err);
            std::process::exit(1);
        }

        config
    }

    /// Create a test configuration pointing at a local Ollama server.
    pub fn for_test() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            cors_origins: "http://localhost:5173".to_string(),
            provider: "ollama".to_string(),
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            openai_api_key: None,
            openai_api_endpoint: None,
            openai_api_version: None,
            ollama_host: crate::adapters::ollama::DEFAULT_HOST.to_string(),
            http_client_timeout: 10,
            log_level: "info".to_string(),
        }
    }

    #[cfg(feature = "cli")]
    fn setup_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_level.as_str())
            .with_target(false)
            .try_init();
    }

    /// Validate settings before any client is built.
    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.port == 0 {
            return Err(ProxyError::Config(
                "Port cannot be 0. Please specify a valid port number (1-65535).".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ProxyError::Config("Host cannot be empty.".to_string()));
        }

        let provider: Provider = self.provider.parse()?;

        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ProxyError::Config(
                    "CHAT_MODEL is set but empty. Unset it to use the provider default.".to_string(),
                ));
            }
        }

        match provider {
            Provider::OpenAI => {
                if self.openai_api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(ProxyError::Config(
                        "OPENAI_API_KEY is required when CHAT_PROVIDER=openai".to_string(),
                    ));
                }
                if let Some(endpoint) = &self.openai_api_endpoint {
                    validate_http_url("OPENAI_API_ENDPOINT", endpoint)?;
                }
                if self.openai_api_version.is_some() && self.openai_api_endpoint.is_none() {
                    return Err(ProxyError::Config(
                        "OPENAI_API_VERSION requires OPENAI_API_ENDPOINT to be set".to_string(),
                    ));
                }
            }
            Provider::Ollama => validate_http_url("OLLAMA_HOST", &self.ollama_host)?,
        }

        if self.http_client_timeout == 0 {
            return Err(ProxyError::Config(
                "HTTP client timeout must be greater than 0 seconds.".to_string(),
            ));
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !self.log_level.contains('=') && !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ProxyError::Config(format!(
                "Invalid log level '{}'. Valid options are: {}",
                self.log_level,
                valid_log_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Construction parameters for the client factory.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_key: self.openai_api_key.clone(),
            model: self.model.clone(),
            base_url: self.openai_api_endpoint.clone(),
            api_version: self.openai_api_version.clone(),
            host: Some(self.ollama_host.clone()),
        }
    }

    /// Parsed list of allowed CORS origins.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ProxyError> {
    let url = Url::parse(value)
        .map_err(|err| ProxyError::Config(format!("Invalid {} '{}': {}", name, value, err)))?;

    if !["http", "https"].contains(&url.scheme()) {
        return Err(ProxyError::Config(format!(
            "Invalid {} scheme '{}'. Only 'http' and 'https' are supported.",
            name,
            url.scheme()
        )));
    }

    if url.host().is_none() {
        return Err(ProxyError::Config(format!("{} must include a host", name)));
    }

    Ok(())
}
