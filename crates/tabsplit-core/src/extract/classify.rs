//! Receipt line classification
//!
//! Recognizes the handful of line shapes the fallback parser cares about:
//! prices, dates, item lines and totals lines.

use chrono::NaiveDate;
use regex::Regex;

use crate::models::ExtractedItem;

/// Which summary amount a totals line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalField {
    Subtotal,
    Tax,
    Tip,
    Total,
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Compiled line patterns
pub struct LineClassifier {
    price: Regex,
    amount: Regex,
    iso_date: Regex,
    numeric_date: Regex,
    month_first_date: Regex,
    day_first_date: Regex,
    qty_x_item: Regex,
    name_price_item: Regex,
    name_qty_price_item: Regex,
    payment: Regex,
    subtotal: Regex,
    tax: Regex,
    tip: Regex,
    total: Regex,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier {
    pub fn new() -> Self {
        let month = r"(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?";
        Self {
            price: Regex::new(r"\$?\d[\d,]*\.\d{2}\b").expect("valid regex"),
            amount: Regex::new(r"\d{1,3}(?:,\d{3})+\.\d+|\d+\.\d+").expect("valid regex"),
            iso_date: Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("valid regex"),
            numeric_date: Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})\b")
                .expect("valid regex"),
            month_first_date: Regex::new(&format!(
                r"(?i)\b{}\s+(\d{{1,2}}),?\s+(\d{{4}})\b",
                month
            ))
            .expect("valid regex"),
            day_first_date: Regex::new(&format!(
                r"(?i)\b(\d{{1,2}})\s+{},?\s+(\d{{4}})\b",
                month
            ))
            .expect("valid regex"),
            qty_x_item: Regex::new(r"^(\d+)\s*[xX]\s+(.+?)\s+\$?(\d+(?:\.\d{1,2})?)$")
                .expect("valid regex"),
            name_price_item: Regex::new(r"^(.*[^\s\d])\s+\$?(\d+\.\d{2})$").expect("valid regex"),
            name_qty_price_item: Regex::new(r"^(.+?)\s+(\d+)\s+\$?(\d+\.\d{2})$")
                .expect("valid regex"),
            payment: Regex::new(
                r"(?i)\b(balance|change|cash|visa|mastercard|amex|card|amount due|payment)\b",
            )
            .expect("valid regex"),
            subtotal: Regex::new(r"(?i)\bsub[\s-]?totals?\b").expect("valid regex"),
            tax: Regex::new(r"(?i)\btax(?:es)?\b").expect("valid regex"),
            tip: Regex::new(r"(?i)\b(?:tips?|gratuity)\b").expect("valid regex"),
            total: Regex::new(r"(?i)\btotals?\b").expect("valid regex"),
        }
    }

    /// Line contains a money amount with cents
    pub fn is_price_line(&self, text: &str) -> bool {
        self.price.is_match(text)
    }

    pub fn is_date_line(&self, text: &str) -> bool {
        self.detect_date(text).is_some()
    }

    /// First date on the line, as `YYYY-MM-DD` when it is a real calendar
    /// date, else the matched text verbatim
    pub fn detect_date(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.iso_date.captures(text) {
            let date = NaiveDate::from_ymd_opt(
                parse_num(&caps[1])? as i32,
                parse_num(&caps[2])?,
                parse_num(&caps[3])?,
            );
            return Some(render_date(date, &caps[0]));
        }

        if let Some(caps) = self.numeric_date.captures(text) {
            let first = parse_num(&caps[1])?;
            let second = parse_num(&caps[2])?;
            let year = expand_year(parse_num(&caps[3])?);
            // Month first, then day first for dates like 25/12/2024
            let date = NaiveDate::from_ymd_opt(year, first, second)
                .or_else(|| NaiveDate::from_ymd_opt(year, second, first));
            return Some(render_date(date, &caps[0]));
        }

        if let Some(caps) = self.month_first_date.captures(text) {
            let date = NaiveDate::from_ymd_opt(
                parse_num(&caps[3])? as i32,
                month_number(&caps[1])?,
                parse_num(&caps[2])?,
            );
            return Some(render_date(date, &caps[0]));
        }

        if let Some(caps) = self.day_first_date.captures(text) {
            let date = NaiveDate::from_ymd_opt(
                parse_num(&caps[3])? as i32,
                month_number(&caps[2])?,
                parse_num(&caps[1])?,
            );
            return Some(render_date(date, &caps[0]));
        }

        None
    }

    /// Parse an item line, trying `<qty>x <name> <amount>`, then
    /// `<name> <price>`, then `<name> <qty> <amount>`
    ///
    /// Totals and payment lines never yield items. For the quantity shapes the
    /// printed amount is the line total.
    pub fn parse_item(&self, text: &str) -> Option<ExtractedItem> {
        let text = text.trim();
        if self.is_totals_line(text) || self.payment.is_match(text) {
            return None;
        }

        if let Some(caps) = self.qty_x_item.captures(text) {
            return make_item(&caps[2], parse_num(&caps[1])?, caps[3].parse().ok()?, true);
        }
        if let Some(caps) = self.name_price_item.captures(text) {
            return make_item(&caps[1], 1, caps[2].parse().ok()?, false);
        }
        if let Some(caps) = self.name_qty_price_item.captures(text) {
            return make_item(&caps[1], parse_num(&caps[2])?, caps[3].parse().ok()?, true);
        }
        None
    }

    /// Every summary field named on this line, matched as whole words
    ///
    /// `total` counts only when the line is not a subtotal line.
    pub fn total_fields(&self, text: &str) -> Vec<TotalField> {
        let mut fields = Vec::new();
        let subtotal = self.subtotal.is_match(text);
        if subtotal {
            fields.push(TotalField::Subtotal);
        }
        if self.tax.is_match(text) {
            fields.push(TotalField::Tax);
        }
        if self.tip.is_match(text) {
            fields.push(TotalField::Tip);
        }
        if !subtotal && self.total.is_match(text) {
            fields.push(TotalField::Total);
        }
        fields
    }

    pub fn is_totals_line(&self, text: &str) -> bool {
        !self.total_fields(text).is_empty()
    }

    /// First decimal-looking number on the line
    pub fn first_amount(&self, text: &str) -> Option<f64> {
        self.amount
            .find(text)
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    }
}

fn make_item(
    name: &str,
    quantity: u32,
    amount: f64,
    amount_is_line_total: bool,
) -> Option<ExtractedItem> {
    let name = name.trim();
    if quantity == 0 || !name.chars().any(char::is_alphabetic) {
        return None;
    }
    let price = if amount_is_line_total {
        amount / quantity as f64
    } else {
        amount
    };
    Some(ExtractedItem {
        name: name.to_string(),
        quantity,
        price,
    })
}

fn parse_num(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn expand_year(year: u32) -> i32 {
    if year < 100 {
        2000 + year as i32
    } else {
        year as i32
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

fn render_date(date: Option<NaiveDate>, raw: &str) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_date_shapes() {
        let c = LineClassifier::new();
        assert_eq!(c.detect_date("01/15/2024"), Some("2024-01-15".into()));
        assert_eq!(c.detect_date("Date: 2024-03-09 18:22"), Some("2024-03-09".into()));
        assert_eq!(c.detect_date("25.12.2023"), Some("2023-12-25".into()));
        assert_eq!(c.detect_date("3-7-24"), Some("2024-03-07".into()));
        assert_eq!(c.detect_date("January 5, 2024"), Some("2024-01-05".into()));
        assert_eq!(c.detect_date("5 Sept 2024"), Some("2024-09-05".into()));
        assert_eq!(c.detect_date("Burger 12.00"), None);
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        let c = LineClassifier::new();
        assert_eq!(c.detect_date("99/99/2024"), Some("99/99/2024".into()));
    }

    #[test]
    fn test_item_shapes() {
        let c = LineClassifier::new();

        let item = c.parse_item("Burger $12.99").unwrap();
        assert_eq!((item.name.as_str(), item.quantity, item.price), ("Burger", 1, 12.99));

        let item = c.parse_item("2 x Soda 5.00").unwrap();
        assert_eq!((item.name.as_str(), item.quantity, item.price), ("Soda", 2, 2.5));

        let item = c.parse_item("3X Taco $9").unwrap();
        assert_eq!((item.quantity, item.price), (3, 3.0));

        let item = c.parse_item("Wings 2 14.00").unwrap();
        assert_eq!((item.name.as_str(), item.quantity, item.price), ("Wings", 2, 7.0));
    }

    #[test]
    fn test_non_items() {
        let c = LineClassifier::new();
        assert!(c.parse_item("Subtotal $17.49").is_none());
        assert!(c.parse_item("Total 18.89").is_none());
        assert!(c.parse_item("VISA 18.89").is_none());
        assert!(c.parse_item("Change 1.11").is_none());
        assert!(c.parse_item("Joe's Diner").is_none());
        assert!(c.parse_item("01/15/2024").is_none());
        assert!(c.parse_item("0 x Water 1.00").is_none());
        assert!(c.parse_item("#42 3.50").is_none());
    }

    #[test]
    fn test_total_fields() {
        let c = LineClassifier::new();
        assert_eq!(c.total_fields("SUBTOTAL 17.49"), vec![TotalField::Subtotal]);
        assert_eq!(c.total_fields("Sub-Total 17.49"), vec![TotalField::Subtotal]);
        assert_eq!(c.total_fields("Sales Tax 1.40"), vec![TotalField::Tax]);
        assert_eq!(c.total_fields("Gratuity 3.00"), vec![TotalField::Tip]);
        assert_eq!(c.total_fields("Total $18.89"), vec![TotalField::Total]);
        assert!(c.total_fields("Burger 12.00").is_empty());
    }

    #[test]
    fn test_line_naming_several_fields() {
        let c = LineClassifier::new();
        assert_eq!(
            c.total_fields("Total incl. tax 4.40"),
            vec![TotalField::Tax, TotalField::Total]
        );
        assert_eq!(
            c.total_fields("Subtotal before tip 20.00"),
            vec![TotalField::Subtotal, TotalField::Tip]
        );
    }

    #[test]
    fn test_keywords_inside_dish_names_are_items() {
        let c = LineClassifier::new();
        assert!(c.total_fields("Antipasto 12.00").is_empty());
        assert!(c.total_fields("Tipsy Burger 9.50").is_empty());
        assert!(c.total_fields("Taxco Tacos 8.00").is_empty());

        let item = c.parse_item("Antipasto 12.00").unwrap();
        assert_eq!((item.name.as_str(), item.price), ("Antipasto", 12.0));
        let item = c.parse_item("Tipsy Burger 9.50").unwrap();
        assert_eq!(item.name, "Tipsy Burger");
    }

    #[test]
    fn test_first_amount() {
        let c = LineClassifier::new();
        assert_eq!(c.first_amount("Total $1,204.50"), Some(1204.50));
        assert_eq!(c.first_amount("Tax (8.25%) 1.40"), Some(8.25));
        assert_eq!(c.first_amount("Total"), None);
    }

    #[test]
    fn test_price_line() {
        let c = LineClassifier::new();
        assert!(c.is_price_line("Fries $4.50"));
        assert!(!c.is_price_line("Joe's Diner"));
        assert!(c.is_date_line("01/15/2024"));
    }
}
