//! # chat-relay
//!
//! A small HTTP relay that forwards a chat message to a language-model
//! provider and streams the reply back to the browser as Server-Sent Events.
//!
//! Two providers are supported behind one streaming capability
//! ([`adapters::ChatClient`]):
//!
//! - **OpenAI**: the OpenAI API, OpenAI-compatible servers and Azure OpenAI
//! - **Ollama**: a local Ollama server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_relay::{create_router, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::for_test();
//!     let state = AppState::new(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, create_router(state)).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Configuration from CLI arguments and the environment
//! - [`adapters`] - Provider adapters and the client factory
//! - [`streaming`] - Wire decoders, the token relay and the SSE response
//! - [`server`] - Router, handlers and application state
//! - [`schemas`] - Request/response and frame data structures
//! - [`error`] - Error type and HTTP mapping

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;
pub mod schemas;
pub mod streaming;

#[cfg(feature = "server")]
pub mod server;

pub use adapters::{Adapter, ChatClient, ChatClientFactory, ChunkStream, ClientOptions, Provider};
pub use config::Config;
pub use core::http_client::{HttpClientBuilder, HttpClientConfig};
pub use error::ProxyError;
pub use schemas::{ChatCompletionChunk, Message, Role, StreamFrame};

#[cfg(feature = "server")]
pub use server::{create_router, shutdown_signal, AppState};

#[cfg(feature = "server")]
pub use streaming::create_streaming_response;

/// The result type used throughout the library
pub type Result<T> = std::result::Result<T, ProxyError>;
