//! Tabsplit settings
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tabsplit/config/tabsplit.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Collaborator endpoints and credentials come from the environment, not from
//! this file (see `AIClient::from_env` and `OcrClient::from_env`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::DistributionMode;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tabsplit.toml");

/// Settings for the extraction pipeline
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Upper bound on one LLM call
    pub llm_timeout: Duration,
    /// Upper bound on one OCR call
    pub ocr_timeout: Duration,
    /// Used when the LLM omits its own confidence
    pub default_structured_confidence: f64,
    /// Lines at or below this confidence are never picked as the restaurant name
    pub name_min_confidence: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(60),
            ocr_timeout: Duration::from_secs(30),
            default_structured_confidence: 85.0,
            name_min_confidence: 80.0,
        }
    }
}

/// Settings applied to newly created receipts
#[derive(Debug, Clone)]
pub struct ReceiptConfig {
    pub owner_name: String,
    pub tax_distribution: DistributionMode,
    pub tip_distribution: DistributionMode,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            owner_name: "Me".to_string(),
            tax_distribution: DistributionMode::Proportional,
            tip_distribution: DistributionMode::Proportional,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub receipts: ReceiptConfig,
    /// Override file this config was read from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load from the default override location, else the embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => parse_config(DEFAULT_CONFIG),
        }
    }

    /// Load from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = parse_config(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tabsplit").join("config").join("tabsplit.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    extraction: Option<RawExtraction>,
    receipts: Option<RawReceipts>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    llm_timeout_secs: Option<u64>,
    ocr_timeout_secs: Option<u64>,
    default_structured_confidence: Option<f64>,
    name_min_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawReceipts {
    owner_name: Option<String>,
    tax_distribution: Option<String>,
    tip_distribution: Option<String>,
}

fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Configuration(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(extraction) = raw.extraction {
        if let Some(secs) = extraction.llm_timeout_secs {
            config.extraction.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = extraction.ocr_timeout_secs {
            config.extraction.ocr_timeout = Duration::from_secs(secs);
        }
        if let Some(conf) = extraction.default_structured_confidence {
            config.extraction.default_structured_confidence = conf.clamp(0.0, 100.0);
        }
        if let Some(conf) = extraction.name_min_confidence {
            config.extraction.name_min_confidence = conf;
        }
    }

    if let Some(receipts) = raw.receipts {
        if let Some(name) = receipts.owner_name.filter(|n| !n.trim().is_empty()) {
            config.receipts.owner_name = name;
        }
        if let Some(mode) = receipts.tax_distribution {
            config.receipts.tax_distribution = mode.parse().map_err(Error::Configuration)?;
        }
        if let Some(mode) = receipts.tip_distribution {
            config.receipts.tip_distribution = mode.parse().map_err(Error::Configuration)?;
        }
    }

    Ok(config)
}
