//! Tabsplit Core Library
//!
//! Shared functionality for the Tabsplit receipt splitter:
//! - OCR collaborator clients (HTTP sidecar, local text, mock)
//! - Pluggable LLM backends for structured receipt extraction
//! - Deterministic line-pattern fallback parser
//! - Split allocation, completion tracking and shareable summaries
//! - Database access with an idempotent finalization ledger

pub mod ai;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod models;
pub mod ocr;
pub mod prompts;
mod receipt;
pub mod split;

/// Test utilities including mock LLM and OCR servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, OllamaBackend, OpenAICompatibleBackend};
pub use completion::{is_complete, progress, unassigned_items, Progress};
pub use config::{Config, ExtractionConfig, ReceiptConfig};
pub use db::Database;
pub use error::{Error, ErrorKind, Result};
pub use extract::{ExtractionOrchestrator, ExtractionOutcome, FallbackParser, StructuredParser};
pub use ledger::FinalizationLedger;
pub use ocr::{HttpOcrBackend, LocalTextOcr, MockOcr, OcrClient, OcrEngine};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use split::{calculate_split, generate_shareable_summary};
