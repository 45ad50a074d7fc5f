//! Domain models for Tabsplit

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ========== Extraction Models ==========

/// One line of text recognized by the OCR collaborator, in reading order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTextLine {
    pub text: String,
    /// Recognition confidence (0-100)
    pub confidence: f64,
}

impl RawTextLine {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Opaque reference to a stored receipt image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLocator {
    pub bucket: String,
    pub key: String,
}

impl ImageLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Which parser produced an extracted receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// Structured LLM parser
    #[default]
    Llm,
    /// Deterministic line-pattern parser
    Fallback,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for ExtractionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "fallback" => Ok(Self::Fallback),
            _ => Err(format!("Unknown extraction source: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchased item as extracted from the receipt text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    pub quantity: u32,
    /// Price per unit, never the line total
    pub price: f64,
}

impl ExtractedItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Normalized output of the extraction pipeline, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceipt {
    pub restaurant_name: Option<String>,
    pub restaurant_address: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub tip: f64,
    #[serde(default)]
    pub total: f64,
    /// Confidence (0-100) of the parser that produced this result
    pub confidence: f64,
    pub extraction_source: ExtractionSource,
}

/// Lifecycle of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Legal transitions: pending -> processing -> completed | failed
    pub fn can_transition_to(&self, next: ExtractionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for ExtractionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown extraction status: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted record of one extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: i64,
    pub bucket: String,
    pub key: String,
    pub status: ExtractionStatus,
    pub source: Option<ExtractionSource>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
    /// SHA256 of the OCR text fed to the parsers
    pub input_hash: Option<String>,
    /// Receipt created from this run, once persisted
    pub receipt_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ========== Receipt Models ==========

/// Relationship of a person to the receipt's owning user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    /// The current user; exactly one per receipt
    Owner,
    #[default]
    Guest,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Guest => "guest",
        }
    }
}

/// Someone sharing the bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub is_registered_user: bool,
    #[serde(default)]
    pub role: PersonRole,
}

impl Person {
    pub fn is_owner(&self) -> bool {
        self.role == PersonRole::Owner
    }
}

/// Persisted form of an extracted item, with its assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    /// Price per unit
    pub price: f64,
    /// Person ids responsible for this item (may be empty)
    #[serde(default)]
    pub assigned_to: Vec<String>,
    pub notes: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }

    pub fn is_assigned(&self) -> bool {
        !self.assigned_to.is_empty()
    }
}

/// Policy for spreading tax or tip across people
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    /// Same amount for everyone
    Equal,
    /// Weighted by each person's assigned subtotal
    #[default]
    Proportional,
}

impl DistributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Proportional => "proportional",
        }
    }
}

impl std::str::FromStr for DistributionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "proportional" => Ok(Self::Proportional),
            _ => Err(format!("Unknown distribution mode: {}", s)),
        }
    }
}

impl std::fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One person's part of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemShare {
    pub item_name: String,
    /// Line total of the item (price * quantity)
    pub full_price: f64,
    pub share_amount: f64,
    /// The other people this item is split with
    pub shared_with: Vec<String>,
}

/// Computed cost breakdown for one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCalculation {
    pub person_id: String,
    pub name: String,
    pub subtotal: f64,
    pub tax_share: f64,
    pub tip_share: f64,
    pub total: f64,
    pub items: Vec<ItemShare>,
}

/// Aggregate root for a split bill
///
/// `split_calculations` is derived and recomputed by every editing operation.
/// `is_complete` is the finalization flag: it only becomes true through the
/// ledger and is never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Database id (0 until persisted)
    pub id: i64,
    /// Owning user
    pub user_id: String,
    pub restaurant_name: Option<String>,
    pub restaurant_address: Option<String>,
    pub date: Option<String>,
    pub people: Vec<Person>,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub tip: f64,
    pub total: f64,
    pub tax_distribution: DistributionMode,
    pub tip_distribution: DistributionMode,
    pub split_calculations: Vec<SplitCalculation>,
    pub is_complete: bool,
    /// Share committed to the ledger at finalization
    pub finalized_share: Option<f64>,
    pub extraction_source: ExtractionSource,
    pub confidence: f64,
    /// Optimistic-concurrency token, bumped on every persisted update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    /// The person representing the owning user
    pub fn owner(&self) -> Option<&Person> {
        self.people.iter().find(|p| p.is_owner())
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Receipt date as a calendar date, when it is in ISO form
    pub fn visit_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Name used to key the restaurant aggregate
    pub fn restaurant_key(&self) -> &str {
        restaurant_key(self.restaurant_name.as_deref())
    }
}

/// Aggregate name for receipts whose restaurant could not be read
pub const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";

/// Trimmed restaurant name, or `UNKNOWN_RESTAURANT` when blank
pub fn restaurant_key(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_RESTAURANT)
}

/// An item nobody has been assigned to yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

// ========== Ledger Models ==========

/// Running spend at one restaurant for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantAggregate {
    pub user_id: String,
    pub name: String,
    pub visit_count: i64,
    /// Sum of finalized per-user shares only
    pub total_spent: f64,
    pub last_visit: Option<NaiveDate>,
}

/// Result of a finalize request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalizeOutcome {
    /// This call committed the share to the restaurant aggregate
    Applied { restaurant: String, amount: f64 },
    /// The receipt was finalized earlier; nothing changed
    AlreadyFinalized,
}
