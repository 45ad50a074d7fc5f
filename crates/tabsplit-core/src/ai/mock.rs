//! Mock backend for testing
//!
//! Returns a canned completion (or a canned failure) without any network.

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::AIBackend;

/// Sample completion used by `MockBackend::new()`
const SAMPLE_RESPONSE: &str = r#"{
  "restaurantName": "Mock Bistro",
  "restaurantAddress": "1 Test Street",
  "date": "2024-01-15",
  "items": [
    {"name": "Burger", "quantity": 1, "price": 12.00},
    {"name": "Fries", "quantity": 2, "price": 3.00}
  ],
  "subtotal": 18.00,
  "tax": 1.80,
  "tip": 3.00,
  "total": 22.80,
  "confidence": 92
}"#;

#[derive(Clone, Debug)]
enum MockReply {
    Text(String),
    /// Simulates an unreachable or erroring service
    Unavailable(String),
    /// Simulates rejected credentials
    Unauthorized,
}

/// Mock AI backend for testing
#[derive(Clone, Debug)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    reply: MockReply,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Healthy backend answering with a well-formed sample receipt
    pub fn new() -> Self {
        Self {
            healthy: true,
            reply: MockReply::Text(SAMPLE_RESPONSE.to_string()),
        }
    }

    /// Healthy backend answering with the given text verbatim
    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            healthy: true,
            reply: MockReply::Text(text.into()),
        }
    }

    /// Backend whose completions fail with an extraction error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            reply: MockReply::Unavailable(message.into()),
        }
    }

    /// Backend whose completions fail with a configuration error
    pub fn unauthorized() -> Self {
        Self {
            healthy: true,
            reply: MockReply::Unauthorized,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, _system: Option<&str>, _user: &str) -> Result<String> {
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Unavailable(message) => Err(Error::Extraction(message.clone())),
            MockReply::Unauthorized => Err(Error::Configuration(
                "mock backend rejected credentials".into(),
            )),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sample_response_is_json() {
        let text = MockBackend::new().complete(None, "anything").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["items"].as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let err = MockBackend::failing("down").complete(None, "x").await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));

        let err = MockBackend::unauthorized().complete(None, "x").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
