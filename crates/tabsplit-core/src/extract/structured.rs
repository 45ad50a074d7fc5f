//! LLM-backed receipt parser
//!
//! Renders the `parse_receipt_text` prompt, sends it to the configured
//! backend and validates the answer into an `ExtractedReceipt`. Anything the
//! model gets wrong is a recoverable error; only configuration errors are fatal.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use crate::ai::parsing::{extract_json_object, truncate_raw};
use crate::ai::{AIBackend, AIClient};
use crate::error::{Error, Result};
use crate::models::{ExtractedItem, ExtractedReceipt, ExtractionSource};
use crate::prompts::{PromptId, PromptLibrary};

/// Confidence used when the model does not report one
pub const DEFAULT_STRUCTURED_CONFIDENCE: f64 = 85.0;

pub struct StructuredParser {
    client: AIClient,
    prompts: Mutex<PromptLibrary>,
    default_confidence: f64,
}

impl StructuredParser {
    pub fn new(client: AIClient) -> Self {
        Self {
            client,
            prompts: Mutex::new(PromptLibrary::new()),
            default_confidence: DEFAULT_STRUCTURED_CONFIDENCE,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Mutex::new(prompts);
        self
    }

    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence.clamp(0.0, 100.0);
        self
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    /// Parse one block of OCR text
    pub async fn parse(&self, ocr_text: &str) -> Result<ExtractedReceipt> {
        let (system, user) = {
            let mut prompts = self
                .prompts
                .lock()
                .map_err(|_| Error::Configuration("Failed to acquire prompt library lock".into()))?;
            let prompt = prompts.get(PromptId::ParseReceiptText)?;
            let mut vars = HashMap::new();
            vars.insert("ocr_text", ocr_text);
            (
                prompt.system_section().map(str::to_string),
                prompt.render_user(&vars),
            )
        };

        let response = self.client.complete(system.as_deref(), &user).await?;
        debug!(
            model = self.client.model(),
            response = %truncate_raw(&response),
            "Structured parser response"
        );

        parse_receipt_json(&response, self.default_confidence)
    }
}

/// Validate and repair a model answer into an `ExtractedReceipt`
///
/// Rejects answers without a JSON object, without a restaurant name, or whose
/// `items` is not an array.
pub fn parse_receipt_json(response: &str, default_confidence: f64) -> Result<ExtractedReceipt> {
    let json = extract_json_object(response)?;
    let value: Value = serde_json::from_str(json).map_err(|e| {
        Error::Validation(format!(
            "Invalid receipt JSON from AI: {} | Raw: {}",
            e,
            truncate_raw(json)
        ))
    })?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Validation("Receipt JSON is not an object".into()))?;

    let restaurant_name = text_field(obj, &["restaurantName", "restaurant_name", "restaurant"])
        .ok_or_else(|| Error::Validation("Receipt JSON has no restaurant name".into()))?;

    let items = field(obj, &["items"])
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Validation("Receipt JSON has no items array".into()))?
        .iter()
        .filter_map(parse_item)
        .collect();

    let confidence = field(obj, &["confidence"])
        .and_then(coerce_number)
        .map(|c| c.clamp(0.0, 100.0))
        .unwrap_or(default_confidence);

    Ok(ExtractedReceipt {
        restaurant_name: Some(restaurant_name),
        restaurant_address: text_field(
            obj,
            &["restaurantAddress", "restaurant_address", "address"],
        ),
        date: text_field(obj, &["date"]),
        items,
        subtotal: amount_field(obj, &["subtotal", "subTotal", "sub_total"]),
        tax: amount_field(obj, &["tax"]),
        tip: amount_field(obj, &["tip", "gratuity"]),
        total: amount_field(obj, &["total"]),
        confidence,
        extraction_source: ExtractionSource::Llm,
    })
}

fn parse_item(value: &Value) -> Option<ExtractedItem> {
    let obj = value.as_object()?;
    let name = text_field(obj, &["name", "description"])?;

    let quantity = field(obj, &["quantity", "qty"])
        .and_then(coerce_number)
        .map(|q| q.round().max(1.0) as u32)
        .unwrap_or(1);

    let price = match field(obj, &["price", "unitPrice", "unit_price"]).and_then(coerce_number) {
        Some(price) => price,
        None => field(obj, &["total", "lineTotal", "line_total"])
            .and_then(coerce_number)
            .map(|total| total / quantity as f64)
            .unwrap_or(0.0),
    };

    Some(ExtractedItem {
        name,
        quantity,
        price: price.max(0.0),
    })
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
}

/// Non-empty trimmed string
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn amount_field(obj: &Map<String, Value>, keys: &[&str]) -> f64 {
    field(obj, keys)
        .and_then(coerce_number)
        .unwrap_or(0.0)
        .max(0.0)
}

/// Numbers, or strings like "$1,204.50"
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}
