//! # HTTP Client Factory
//!
//! Builds the `reqwest::Client` shared by both provider adapters. Only a
//! connect timeout is applied: a completion stream stays open for as long as
//! the model keeps generating.

use crate::config::Config;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {0}")]
    BuildError(#[from] reqwest::Error),
}

/// Idle connection reuse towards the provider.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub tcp_keepalive: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub pool: PoolConfig,
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.http_client_timeout),
            pool: PoolConfig::default(),
        }
    }
}

pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: HttpClientConfig::from(config),
        }
    }

    pub fn build(self) -> Result<Client, HttpClientError> {
        let HttpClientConfig { connect_timeout, pool } = self.config;

        Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .pool_idle_timeout(pool.idle_timeout)
            .tcp_keepalive(pool.tcp_keepalive)
            .build()
            .map_err(HttpClientError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_timeout_from_config() {
        let mut config = Config::for_test();
        config.http_client_timeout = 3;

        let client_config = HttpClientConfig::from(&config);
        assert_eq!(client_config.connect_timeout, Duration::from_secs(3));
        assert_eq!(client_config.pool.max_idle_per_host, 10);
    }

    #[test]
    fn test_build_from_config() {
        let client = HttpClientBuilder::from_config(&Config::for_test()).build().unwrap();
        assert!(client.post("http://localhost:11434/api/chat").build().is_ok());
    }
}
