//! Pluggable LLM backend abstraction
//!
//! The structured receipt parser talks to a language model through this
//! module. Backends are plain text-completion endpoints; prompt rendering and
//! response validation live in `extract::structured`.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: ollama (default), openai, openai_compatible, mock, none
//! - `OLLAMA_HOST` / `OLLAMA_MODEL` (default: llama3.2)
//! - `OPENAI_API_KEY` (required for openai) / `OPENAI_MODEL` (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_HOST` / `OPENAI_COMPATIBLE_MODEL` / `OPENAI_COMPATIBLE_API_KEY`

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait defining the interface for all LLM backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one completion and return the raw model text
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging and job records)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI or any server speaking `/v1/chat/completions`
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns `Ok(None)` when no backend is configured (`AI_BACKEND=none`, or
    /// the selected backend's host variable is unset). The extraction pipeline
    /// then goes straight to the line-pattern parser.
    ///
    /// Fails with `Error::Configuration` when the hosted OpenAI backend is
    /// selected without an API key.
    pub fn from_env() -> Result<Option<Self>> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        let client = match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "openai" => Some(AIClient::OpenAICompatible(
                OpenAICompatibleBackend::openai_from_env()?,
            )),
            "openai_compatible" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            "none" | "off" => None,
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        };

        Ok(client)
    }

    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Bound every request made by this client
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_timeout(timeout)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_timeout(timeout)),
            AIClient::Mock(b) => AIClient::Mock(b),
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.complete(system, user).await,
            AIClient::OpenAICompatible(b) => b.complete(system, user).await,
            AIClient::Mock(b) => b.complete(system, user).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Map a non-success HTTP status from an LLM service to an error
///
/// Authentication failures are configuration problems and are never retried
/// or papered over by the fallback parser.
pub(crate) fn status_error(service: &str, status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Error::Configuration(format!("{} rejected credentials ({})", service, status))
    } else {
        Error::Extraction(format!(
            "{} error {}: {}",
            service,
            status,
            parsing::truncate_raw(body)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[test]
    fn test_status_error_auth_is_configuration() {
        let err = status_error("OpenAI API", reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, Error::Configuration(_)));

        let err = status_error("OpenAI API", reqwest::StatusCode::BAD_GATEWAY, "oops");
        assert!(matches!(err, Error::Extraction(_)));
    }
}
