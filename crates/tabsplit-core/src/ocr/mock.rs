//! Mock OCR for testing

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ImageLocator, RawTextLine};

use super::OcrEngine;

#[derive(Clone, Debug)]
enum MockScan {
    Lines(Vec<RawTextLine>),
    NotFound,
    Unavailable,
}

/// Returns the same scan for every locator
#[derive(Clone, Debug)]
pub struct MockOcr {
    scan: MockScan,
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOcr {
    /// A small diner receipt
    pub fn new() -> Self {
        Self::with_lines(vec![
            RawTextLine::new("JOE'S DINER", 95.0),
            RawTextLine::new("01/15/2024", 90.0),
            RawTextLine::new("Burger 12.00", 92.0),
            RawTextLine::new("2 x Soda 5.00", 88.0),
            RawTextLine::new("Subtotal 17.00", 93.0),
            RawTextLine::new("Tax 1.70", 91.0),
            RawTextLine::new("Total 18.70", 94.0),
        ])
    }

    pub fn with_lines(lines: Vec<RawTextLine>) -> Self {
        Self {
            scan: MockScan::Lines(lines),
        }
    }

    pub fn not_found() -> Self {
        Self {
            scan: MockScan::NotFound,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            scan: MockScan::Unavailable,
        }
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn recognize(&self, locator: &ImageLocator) -> Result<Vec<RawTextLine>> {
        match &self.scan {
            MockScan::Lines(lines) => Ok(lines.clone()),
            MockScan::NotFound => Err(Error::DocumentNotFound(locator.to_string())),
            MockScan::Unavailable => Err(Error::Extraction("mock OCR unavailable".into())),
        }
    }

    async fn health_check(&self) -> bool {
        !matches!(self.scan, MockScan::Unavailable)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
