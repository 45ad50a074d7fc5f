//! Receipt extraction pipeline
//!
//! OCR -> structured (LLM) parser -> fallback line parser. The orchestrator
//! returns a tagged `ExtractionOutcome` so callers can see which path
//! produced the receipt, or why nothing did.

pub mod classify;
pub mod fallback;
pub mod structured;

pub use classify::{LineClassifier, TotalField};
pub use fallback::FallbackParser;
pub use structured::{parse_receipt_json, StructuredParser};

use tracing::{info, warn};

use crate::ai::AIClient;
use crate::config::ExtractionConfig;
use crate::db::{hash_text, Database};
use crate::error::{Error, Result};
use crate::models::{ExtractedReceipt, ExtractionJob, ExtractionStatus, ImageLocator, RawTextLine};
use crate::ocr::{OcrClient, OcrEngine};

/// Result of one extraction run
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// The LLM answer passed validation
    Structured(ExtractedReceipt),
    /// The line-pattern parser produced the receipt; `reason` says why the
    /// structured parser was not used
    Fallback {
        receipt: ExtractedReceipt,
        reason: String,
    },
    /// OCR failed, configuration is broken, or neither parser produced anything
    Failed(Error),
}

impl ExtractionOutcome {
    pub fn receipt(&self) -> Option<&ExtractedReceipt> {
        match self {
            Self::Structured(receipt) | Self::Fallback { receipt, .. } => Some(receipt),
            Self::Failed(_) => None,
        }
    }

    /// Terminal job status for this outcome
    pub fn status(&self) -> ExtractionStatus {
        match self {
            Self::Structured(_) | Self::Fallback { .. } => ExtractionStatus::Completed,
            Self::Failed(_) => ExtractionStatus::Failed,
        }
    }

    pub fn into_result(self) -> Result<ExtractedReceipt> {
        match self {
            Self::Structured(receipt) | Self::Fallback { receipt, .. } => Ok(receipt),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Sequences OCR and the two parsers for one image
pub struct ExtractionOrchestrator {
    ocr: OcrClient,
    structured: Option<StructuredParser>,
    fallback: FallbackParser,
}

impl ExtractionOrchestrator {
    /// Build with collaborator timeouts and confidences from `config`
    ///
    /// With `ai = None` every run goes straight to the fallback parser.
    pub fn new(ocr: OcrClient, ai: Option<AIClient>, config: &ExtractionConfig) -> Self {
        Self {
            ocr: ocr.with_timeout(config.ocr_timeout),
            structured: ai.map(|client| {
                StructuredParser::new(client.with_timeout(config.llm_timeout))
                    .with_default_confidence(config.default_structured_confidence)
            }),
            fallback: FallbackParser::new(config.name_min_confidence),
        }
    }

    /// Swap in a preconfigured structured parser (custom prompts, tests)
    pub fn with_structured_parser(mut self, parser: StructuredParser) -> Self {
        self.structured = Some(parser);
        self
    }

    /// Collaborators from the environment (`AI_BACKEND`, `OCR_BACKEND`, ...)
    pub fn from_env(config: &ExtractionConfig) -> Result<Self> {
        let ocr = OcrClient::from_env()?;
        let ai = AIClient::from_env()?;
        if ai.is_none() {
            info!("No AI backend configured, extraction will use line patterns only");
        }
        Ok(Self::new(ocr, ai, config))
    }

    pub fn ocr(&self) -> &OcrClient {
        &self.ocr
    }

    pub fn ai(&self) -> Option<&AIClient> {
        self.structured.as_ref().map(StructuredParser::client)
    }

    /// Extract one receipt image
    pub async fn extract(&self, locator: &ImageLocator) -> ExtractionOutcome {
        match self.ocr.recognize(locator).await {
            Ok(lines) => self.extract_lines(&lines).await,
            Err(err) => {
                warn!(image = %locator, error = %err, "OCR failed");
                ExtractionOutcome::Failed(err)
            }
        }
    }

    /// `extract` flattened to a `Result`
    pub async fn extract_receipt(&self, locator: &ImageLocator) -> Result<ExtractedReceipt> {
        self.extract(locator).await.into_result()
    }

    /// Parse already-recognized lines
    pub async fn extract_lines(&self, lines: &[RawTextLine]) -> ExtractionOutcome {
        if lines.is_empty() {
            return ExtractionOutcome::Failed(Error::Extraction(
                "OCR recognized no text".into(),
            ));
        }

        let reason = match &self.structured {
            Some(parser) => match parser.parse(&join_lines(lines)).await {
                Ok(receipt) => return ExtractionOutcome::Structured(receipt),
                Err(err @ Error::Configuration(_)) => return ExtractionOutcome::Failed(err),
                Err(err) => {
                    warn!(error = %err, "Structured parse failed, using fallback parser");
                    err.to_string()
                }
            },
            None => "no AI backend configured".to_string(),
        };

        match self.fallback.parse(lines) {
            Ok(receipt) => ExtractionOutcome::Fallback { receipt, reason },
            Err(err) => ExtractionOutcome::Failed(err),
        }
    }

    /// Run one extraction and record it in `extraction_jobs`
    ///
    /// Collaborator failures are recorded on the job and returned in the
    /// outcome; only persistence errors surface as `Err`.
    pub async fn run_job(
        &self,
        db: &Database,
        locator: &ImageLocator,
    ) -> Result<(ExtractionJob, ExtractionOutcome)> {
        let job_id = db.create_extraction_job(locator)?;
        db.transition_extraction_job(job_id, ExtractionStatus::Processing)?;

        let outcome = match self.ocr.recognize(locator).await {
            Ok(lines) => {
                db.set_extraction_input_hash(job_id, &hash_text(&join_lines(&lines)))?;
                self.extract_lines(&lines).await
            }
            Err(err) => {
                warn!(image = %locator, error = %err, "OCR failed");
                ExtractionOutcome::Failed(err)
            }
        };

        match &outcome {
            ExtractionOutcome::Structured(receipt)
            | ExtractionOutcome::Fallback { receipt, .. } => {
                db.complete_extraction_job(job_id, receipt.extraction_source, receipt.confidence)?;
                info!(
                    job = job_id,
                    source = %receipt.extraction_source,
                    confidence = receipt.confidence,
                    items = receipt.items.len(),
                    "Extraction completed"
                );
            }
            ExtractionOutcome::Failed(err) => {
                db.fail_extraction_job(job_id, &err.to_string())?;
                info!(job = job_id, kind = %err.kind(), "Extraction failed");
            }
        }

        let job = db
            .get_extraction_job(job_id)?
            .ok_or_else(|| Error::NotFound(format!("extraction job {}", job_id)))?;
        Ok((job, outcome))
    }
}

fn join_lines(lines: &[RawTextLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
