//! OpenAI-compatible backend implementation
//!
//! Works with OpenAI itself and with any server implementing the chat
//! completions API (vLLM, LocalAI, llama-server, Docker Model Runner).
//!
//! # Configuration
//!
//! Hosted OpenAI (`AI_BACKEND=openai`):
//! - `OPENAI_API_KEY`: required
//! - `OPENAI_MODEL`: model name (default: gpt-4o-mini)
//!
//! Self-hosted (`AI_BACKEND=openai_compatible`):
//! - `OPENAI_COMPATIBLE_HOST`: server URL (required)
//! - `OPENAI_COMPATIBLE_MODEL`: model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::{status_error, AIBackend};

const OPENAI_HOST: &str = "https://api.openai.com";

#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAICompatibleBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    /// Hosted OpenAI; a missing key is a configuration error
    pub fn openai_from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration("AI_BACKEND=openai requires OPENAI_API_KEY".into())
            })?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self::with_api_key(OPENAI_HOST, &model, &api_key))
    }

    /// Self-hosted server; `None` if `OPENAI_COMPATIBLE_HOST` is unset
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OPENAI_COMPATIBLE_HOST").ok()?;
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let mut backend = Self::new(&host, &model);
        backend.api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY").ok();
        Some(backend)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.header("Authorization", format!("Bearer {}", api_key)),
            None => builder,
        }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user.to_string(),
        });

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.1),
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
            stream: false,
        };

        let response = self
            .authorize(
                self.http_client
                    .post(format!("{}/v1/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("OpenAI API", status, &body));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;
        debug!(model = %self.model, "Chat completion received");

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Extraction("No response from OpenAI API".into()))
    }

    async fn health_check(&self) -> bool {
        let models = self
            .authorize(self.http_client.get(format!("{}/v1/models", self.base_url)))
            .send()
            .await;
        if let Ok(resp) = models {
            if resp.status().is_success() {
                return true;
            }
        }

        match self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
