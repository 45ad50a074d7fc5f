//! OCR sidecar client
//!
//! `POST {host}/v1/ocr` with `{"bucket": .., "key": ..}` answers
//! `{"lines": [{"text": .., "confidence": ..}]}`. A 404 means the image does
//! not exist.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::parsing::truncate_raw;
use crate::error::{Error, Result};
use crate::models::{ImageLocator, RawTextLine};

use super::{clamp_confidence, OcrEngine};

#[derive(Clone)]
pub struct HttpOcrBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    bucket: &'a str,
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    lines: Vec<OcrLine>,
}

#[derive(Debug, Deserialize)]
struct OcrLine {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

impl HttpOcrBackend {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl OcrEngine for HttpOcrBackend {
    async fn recognize(&self, locator: &ImageLocator) -> Result<Vec<RawTextLine>> {
        let mut request = self
            .http_client
            .post(format!("{}/v1/ocr", self.base_url))
            .json(&OcrRequest {
                bucket: &locator.bucket,
                key: &locator.key,
            });
        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::DocumentNotFound(locator.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Configuration(format!(
                "OCR service rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "OCR service error {}: {}",
                status,
                truncate_raw(&body)
            )));
        }

        let parsed: OcrResponse = response.json().await?;
        debug!(image = %locator, lines = parsed.lines.len(), "OCR lines received");

        Ok(parsed
            .lines
            .into_iter()
            .map(|line| RawTextLine {
                text: line.text,
                confidence: clamp_confidence(line.confidence.unwrap_or(0.0)),
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
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

    fn name(&self) -> &str {
        "http"
    }
}
