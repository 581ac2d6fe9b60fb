//! # Provider Adapters Module
//!
//! Adapters that turn a provider's native streaming protocol into the uniform
//! [`ChunkStream`], and the factory that picks one from configuration.
//!
//! ## Supported Providers:
//!
//! - **OpenAI**: OpenAI API, OpenAI-compatible endpoints and Azure OpenAI
//! - **Ollama**: local Ollama server

use crate::{
    config::Config,
    core::http_client::HttpClientBuilder,
    error::ProxyError,
    schemas::Message,
};
use reqwest::Client;
use std::{fmt, str::FromStr};
use tracing::info;

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{AdapterUtils, ChatClient, ChunkStream};
pub use ollama::OllamaAdapter;
pub use openai::{OpenAIAdapter, OpenAIEndpoint};

/// Chat provider named by `CHAT_PROVIDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Ollama,
}

impl FromStr for Provider {
    type Err = ProxyError;

    /// Case-insensitive; anything other than `openai` or `ollama` is a
    /// configuration error.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            _ => Err(ProxyError::Config(format!(
                "Unsupported provider: {}. Use 'ollama' or 'openai'",
                name
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => f.write_str("openai"),
            Provider::Ollama => f.write_str("ollama"),
        }
    }
}

/// Construction parameters for either provider. Each adapter reads the
/// fields it needs and ignores the rest.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub host: Option<String>,
}

/// # Provider Adapter
///
/// Enum dispatch over the supported providers. Built once at startup and
/// cloned into each request; holds no per-request state.
#[derive(Clone, Debug)]
pub enum Adapter {
    OpenAI(OpenAIAdapter),
    Ollama(OllamaAdapter),
}

/// Selects and builds the adapter for a provider name.
pub struct ChatClientFactory;

impl ChatClientFactory {
    pub fn create_client(
        provider: &str,
        options: ClientOptions,
        client: Client,
    ) -> Result<Adapter, ProxyError> {
        match provider.parse::<Provider>()? {
            Provider::Ollama => {
                let model = options.model.unwrap_or_else(|| ollama::DEFAULT_MODEL.to_string());
                let host = options.host.unwrap_or_else(|| ollama::DEFAULT_HOST.to_string());
                Ok(Adapter::Ollama(OllamaAdapter::new(model, &host, client)))
            }
            Provider::OpenAI => {
                let api_key = options
                    .api_key
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| ProxyError::Config("API key is required for OpenAI client".to_string()))?;
                let model = options.model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
                let adapter = OpenAIAdapter::new(api_key, model, options.base_url, options.api_version, client)?;
                Ok(Adapter::OpenAI(adapter))
            }
        }
    }
}

impl Adapter {
    /// Build the adapter described by the configuration, with its own HTTP client.
    pub fn from_config(cfg: &Config) -> Result<Self, ProxyError> {
        let client = HttpClientBuilder::from_config(cfg).build()?;
        let adapter = ChatClientFactory::create_client(&cfg.provider, cfg.client_options(), client)?;

        info!(provider = adapter.name(), model = adapter.model_id(), "Chat client ready");
        Ok(adapter)
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::OpenAI(_) => Provider::OpenAI,
            Self::Ollama(_) => Provider::Ollama,
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for Adapter {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAI(adapter) => adapter.name(),
            Self::Ollama(adapter) => adapter.name(),
        }
    }

    fn model_id(&self) -> &str {
        match self {
            Self::OpenAI(adapter) => adapter.model_id(),
            Self::Ollama(adapter) => adapter.model_id(),
        }
    }

    fn chat_completion(&self, messages: Vec<Message>) -> ChunkStream {
        match self {
            Self::OpenAI(adapter) => adapter.chat_completion(messages),
            Self::Ollama(adapter) => adapter.chat_completion(messages),
        }
    }
}
