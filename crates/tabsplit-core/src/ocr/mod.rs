//! OCR collaborator clients
//!
//! Text recognition happens outside this crate. These clients turn an image
//! locator into ordered `RawTextLine`s and keep "document not found" distinct
//! from transient failures.
//!
//! # Configuration
//!
//! Environment variables:
//! - `OCR_BACKEND`: http, local, mock. Default: http when `OCR_HOST` is set,
//!   else local when `TABSPLIT_IMAGE_ROOT` is set
//! - `OCR_HOST`: OCR sidecar URL (http backend)
//! - `OCR_API_KEY`: bearer token for the sidecar (optional)
//! - `TABSPLIT_IMAGE_ROOT`: directory of pre-recognized `.txt` files (local backend)

mod http;
mod local;
mod mock;

pub use http::HttpOcrBackend;
pub use local::LocalTextOcr;
pub use mock::MockOcr;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ImageLocator, RawTextLine};

/// Interface every OCR client implements
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the image at `locator`, lines in reading order
    ///
    /// Fails with `Error::DocumentNotFound` when the image does not exist and
    /// `Error::Extraction` (or `Error::Http`) for transient faults.
    async fn recognize(&self, locator: &ImageLocator) -> Result<Vec<RawTextLine>>;

    async fn health_check(&self) -> bool;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

#[derive(Clone)]
pub enum OcrClient {
    Http(HttpOcrBackend),
    Local(LocalTextOcr),
    Mock(MockOcr),
}

impl OcrClient {
    /// Create an OCR client from environment variables
    ///
    /// Unlike the LLM, OCR is mandatory: a missing backend is a configuration error.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("OCR_HOST").ok();
        let root = std::env::var("TABSPLIT_IMAGE_ROOT").ok();
        let backend = std::env::var("OCR_BACKEND").ok().unwrap_or_else(|| {
            if host.is_some() || root.is_none() {
                "http".to_string()
            } else {
                "local".to_string()
            }
        });

        match backend.to_lowercase().as_str() {
            "http" => {
                let host = host.ok_or_else(|| {
                    Error::Configuration(
                        "No OCR backend configured: set OCR_HOST or TABSPLIT_IMAGE_ROOT".into(),
                    )
                })?;
                let api_key = std::env::var("OCR_API_KEY").ok();
                Ok(OcrClient::Http(HttpOcrBackend::new(&host, api_key)))
            }
            "local" => {
                let root = root.ok_or_else(|| {
                    Error::Configuration("OCR_BACKEND=local requires TABSPLIT_IMAGE_ROOT".into())
                })?;
                Ok(OcrClient::Local(LocalTextOcr::new(PathBuf::from(root))))
            }
            "mock" => Ok(OcrClient::Mock(MockOcr::new())),
            other => Err(Error::Configuration(format!(
                "Unknown OCR_BACKEND: {}",
                other
            ))),
        }
    }

    /// Bound every request made by this client
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            OcrClient::Http(b) => OcrClient::Http(b.with_timeout(timeout)),
            other => other,
        }
    }
}

#[async_trait]
impl OcrEngine for OcrClient {
    async fn recognize(&self, locator: &ImageLocator) -> Result<Vec<RawTextLine>> {
        match self {
            OcrClient::Http(b) => b.recognize(locator).await,
            OcrClient::Local(b) => b.recognize(locator).await,
            OcrClient::Mock(b) => b.recognize(locator).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            OcrClient::Http(b) => b.health_check().await,
            OcrClient::Local(b) => b.health_check().await,
            OcrClient::Mock(b) => b.health_check().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            OcrClient::Http(b) => b.name(),
            OcrClient::Local(b) => b.name(),
            OcrClient::Mock(b) => b.name(),
        }
    }
}

/// Recognizer confidences are reported on 0-100
pub(crate) fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(120.0), 100.0);
        assert_eq!(clamp_confidence(-3.0), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(87.5), 87.5);
    }

    #[tokio::test]
    async fn test_client_dispatches_to_mock() {
        let client = OcrClient::Mock(MockOcr::with_lines(vec![RawTextLine::new("HELLO", 99.0)]));
        let lines = client
            .recognize(&ImageLocator::new("receipts", "a.jpg"))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(client.name(), "mock");
    }
}
