//! # Application State
//!
//! Shared state handed to every handler: the configuration and the provider
//! adapter built from it. The adapter holds no per-request state, so one
//! instance serves all concurrent requests.

use crate::{
    adapters::Adapter,
    config::Config,
    error::ProxyError,
    schemas::Message,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub adapter: Adapter,
}

impl AppState {
    /// Build state from configuration, creating the provider adapter.
    ///
    /// Fails with a configuration error when the provider is unknown or the
    /// cloud provider has no API key.
    pub fn new(config: Config) -> Result<Self, ProxyError> {
        let adapter = Adapter::from_config(&config)?;
        Ok(Self::with_adapter(config, adapter))
    }

    /// Build state around an existing adapter.
    pub fn with_adapter(config: Config, adapter: Adapter) -> Self {
        Self {
            config: Arc::new(config),
            adapter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// The two-message conversation sent upstream for one user message.
    pub fn conversation(&self, user_message: &str) -> Vec<Message> {
        vec![
            Message::system(self.config.system_prompt.as_str()),
            Message::user(user_message),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::ChatClient, schemas::Role};

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(Config::for_test()).unwrap();
        assert_eq!(state.adapter().name(), "ollama");
        assert_eq!(state.config().port, 8000);
    }

    #[test]
    fn test_app_state_rejects_openai_without_key() {
        let mut config = Config::for_test();
        config.provider = "openai".to_string();

        assert!(matches!(AppState::new(config), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_conversation_prepends_system_prompt() {
        let mut config = Config::for_test();
        config.system_prompt = "Answer in haiku.".to_string();
        let state = AppState::new(config).unwrap();

        let messages = state.conversation("hi");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Answer in haiku.");
        assert_eq!(messages[1], Message::user("hi"));
    }
}
