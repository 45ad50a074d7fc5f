//! Deterministic receipt parser over OCR lines
//!
//! Used when the structured parser is unavailable or its answer is rejected.

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ExtractedReceipt, ExtractionSource, RawTextLine};

use super::classify::{LineClassifier, TotalField};

/// Default minimum confidence for a restaurant-name candidate
pub const NAME_MIN_CONFIDENCE: f64 = 80.0;

pub struct FallbackParser {
    classifier: LineClassifier,
    name_min_confidence: f64,
}

impl Default for FallbackParser {
    fn default() -> Self {
        Self::new(NAME_MIN_CONFIDENCE)
    }
}

impl FallbackParser {
    pub fn new(name_min_confidence: f64) -> Self {
        Self {
            classifier: LineClassifier::new(),
            name_min_confidence,
        }
    }

    pub fn parse(&self, lines: &[RawTextLine]) -> Result<ExtractedReceipt> {
        if lines.is_empty() {
            return Err(Error::Extraction("No text lines to parse".into()));
        }

        let mut receipt = ExtractedReceipt {
            restaurant_name: self.restaurant_name(lines),
            restaurant_address: None,
            date: lines
                .iter()
                .find_map(|line| self.classifier.detect_date(&line.text)),
            items: Vec::new(),
            subtotal: 0.0,
            tax: 0.0,
            tip: 0.0,
            total: 0.0,
            confidence: lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64,
            extraction_source: ExtractionSource::Fallback,
        };

        for line in lines {
            let text = line.text.trim();

            let fields = self.classifier.total_fields(text);
            if !fields.is_empty() {
                if let Some(amount) = self.classifier.first_amount(text) {
                    for field in fields {
                        match field {
                            TotalField::Subtotal => receipt.subtotal = amount,
                            TotalField::Tax => receipt.tax = amount,
                            TotalField::Tip => receipt.tip = amount,
                            TotalField::Total => receipt.total = amount,
                        }
                    }
                }
                continue;
            }

            if let Some(item) = self.classifier.parse_item(text) {
                receipt.items.push(item);
            }
        }

        debug!(
            items = receipt.items.len(),
            name = ?receipt.restaurant_name,
            confidence = receipt.confidence,
            "Fallback parse complete"
        );
        Ok(receipt)
    }

    /// Most confident plausible name line; reading order breaks ties
    fn restaurant_name(&self, lines: &[RawTextLine]) -> Option<String> {
        let mut ranked: Vec<&RawTextLine> = lines.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        ranked
            .into_iter()
            .find(|line| {
                let text = line.text.trim();
                line.confidence > self.name_min_confidence
                    && text.chars().count() > 3
                    && !self.classifier.is_price_line(text)
                    && !self.classifier.is_date_line(text)
            })
            .map(|line| line.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[(&str, f64)]) -> Vec<RawTextLine> {
        raw.iter().map(|(t, c)| RawTextLine::new(*t, *c)).collect()
    }

    #[test]
    fn test_joes_diner() {
        let input = lines(&[
            ("Joe's Diner", 96.0),
            ("01/15/2024", 90.0),
            ("Burger $12.99", 92.0),
            ("Fries $4.50", 91.0),
            ("Subtotal $17.49", 94.0),
            ("Tax $1.40", 93.0),
            ("Total $18.89", 95.0),
        ]);

        let receipt = FallbackParser::default().parse(&input).unwrap();

        assert_eq!(receipt.restaurant_name.as_deref(), Some("Joe's Diner"));
        assert_eq!(receipt.date.as_deref(), Some("2024-01-15"));
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[0].name, "Burger");
        assert_eq!(receipt.items[0].quantity, 1);
        assert_eq!(receipt.items[0].price, 12.99);
        assert_eq!(receipt.items[1].name, "Fries");
        assert_eq!(receipt.items[1].quantity, 1);
        assert_eq!(receipt.subtotal, 17.49);
        assert_eq!(receipt.tax, 1.40);
        assert_eq!(receipt.total, 18.89);
        assert_eq!(receipt.extraction_source, ExtractionSource::Fallback);
    }

    #[test]
    fn test_confidence_is_mean_of_lines() {
        let input = lines(&[("CAFE ROMA", 90.0), ("Latte 4.00", 70.0)]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        assert!((receipt.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_name_skips_low_confidence_short_price_and_date_lines() {
        let input = lines(&[
            ("BLURRY NAME", 60.0),
            ("Tea 3.00", 99.0),
            ("02/03/2024", 98.0),
            ("Inn", 97.0),
            ("Noodle House", 85.0),
        ]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        assert_eq!(receipt.restaurant_name.as_deref(), Some("Noodle House"));
    }

    #[test]
    fn test_name_tie_keeps_reading_order() {
        let input = lines(&[("First Place", 90.0), ("Second Place", 90.0)]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        assert_eq!(receipt.restaurant_name.as_deref(), Some("First Place"));
    }

    #[test]
    fn test_last_total_wins() {
        let input = lines(&[("Total 10.00", 90.0), ("TOTAL DUE 12.50", 90.0)]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        assert_eq!(receipt.total, 12.50);
        assert!(receipt.items.is_empty());
    }

    #[test]
    fn test_total_line_mentioning_tax() {
        let input = lines(&[
            ("Cafe Nord", 92.0),
            ("Latte 4.00", 90.0),
            ("Total incl. tax 4.40", 90.0),
        ]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        assert_eq!(receipt.total, 4.40);
        assert_eq!(receipt.tax, 4.40);
        assert_eq!(receipt.items.len(), 1);
    }

    #[test]
    fn test_dish_names_containing_keywords_stay_items() {
        let input = lines(&[
            ("Trattoria Roma", 95.0),
            ("Antipasto 12.00", 90.0),
            ("Tipsy Burger 9.50", 90.0),
            ("Pasta 10.00", 90.0),
            ("Total 31.50", 90.0),
        ]);
        let receipt = FallbackParser::default().parse(&input).unwrap();
        let names: Vec<&str> = receipt.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Antipasto", "Tipsy Burger", "Pasta"]);
        assert_eq!(receipt.tip, 0.0);
        assert_eq!(receipt.total, 31.50);
    }

    #[test]
    fn test_empty_lines_fail() {
        let err = FallbackParser::default().parse(&[]).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
