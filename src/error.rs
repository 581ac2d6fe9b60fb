#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Invalid or missing settings; raised while building the provider client.
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Upstream Error: {0}")]
    Upstream(String),
    #[error("Internal Error: {0}")]
    Internal(String),
    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl ProxyError {
    /// Short machine-readable category used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Config(_) => "configuration_error",
            ProxyError::BadRequest(_) => "invalid_request_error",
            ProxyError::Upstream(_) => "api_error",
            ProxyError::Internal(_) => "internal_error",
            ProxyError::Serialization(_) => "serialization_error",
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Config(_) | ProxyError::Internal(_) | ProxyError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        }));

        (status, body).into_response()
    }
}

/// # From Trait Implementations
///
/// Conversions from the error types the adapters run into, so `?` can be used
/// throughout the provider code.
impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Upstream("Request timeout - provider did not respond in time".to_string())
        } else if err.is_connect() {
            ProxyError::Upstream(format!("Connection failed - unable to reach provider: {}", err))
        } else if let Some(status) = err.status() {
            ProxyError::Upstream(format!("HTTP {}: {}", status.as_u16(), err))
        } else if err.is_builder() {
            ProxyError::Internal(format!("Invalid provider request: {}", err))
        } else {
            ProxyError::Upstream(format!("HTTP client error: {}", err))
        }
    }
}

impl From<eventsource_stream::EventStreamError<reqwest::Error>> for ProxyError {
    fn from(err: eventsource_stream::EventStreamError<reqwest::Error>) -> Self {
        match err {
            eventsource_stream::EventStreamError::Transport(err) => err.into(),
            other => ProxyError::Serialization(format!("Invalid event stream: {}", other)),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::Config(format!("Invalid URL: {}", err))
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => {
                ProxyError::Upstream("I/O operation timed out".to_string())
            }
            _ => ProxyError::Internal(format!("I/O error: {}", err)),
        }
    }
}

impl From<crate::core::http_client::HttpClientError> for ProxyError {
    fn from(err: crate::core::http_client::HttpClientError) -> Self {
        ProxyError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = ProxyError::Config("Unsupported provider: azure".to_string());
        assert_eq!(err.to_string(), "Configuration Error: Unsupported provider: azure");
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn test_json_error_is_serialization() {
        let err: ProxyError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ProxyError::Serialization(_)));
    }

    #[test]
    fn test_url_error_is_config() {
        let err: ProxyError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProxyError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ProxyError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (ProxyError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ProxyError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
