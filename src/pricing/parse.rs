//! Lenient decimal parsing for values scraped from market-data feeds

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parses a quote string. A comma marks the decimal point and dots group
/// thousands ("1.234,56"); without a comma a single dot is the decimal point
/// ("32.50") and several dots are grouping ("1.234.567"). A second comma or
/// a dot after the comma ("2,456.78") is malformed.
pub fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if let Some(comma) = trimmed.rfind(',') {
        if trimmed.matches(',').count() > 1 || trimmed[comma..].contains('.') {
            return None;
        }
        trimmed.replace('.', "").replace(',', ".")
    } else if trimmed.matches('.').count() > 1 {
        trimmed.replace('.', "")
    } else {
        trimmed.to_string()
    };
    let normalized: String = normalized.chars().filter(|c| !c.is_whitespace()).collect();

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Reads a JSON number through its textual form so no binary float rounding
/// leaks into the result.
pub fn parse_decimal_number(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Accepts a JSON number or a string holding one; anything else is `None`.
pub fn parse_decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_number(n),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}
