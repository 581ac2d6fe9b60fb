//! Shared infrastructure used by the adapters.

pub mod http_client;
