//! Sanitation for operator-entered prices.
//!
//! Price fields arrive as free text from the dashboard. Only ASCII digits
//! and the decimal point survive; anything else is stripped before a value
//! is parsed.

use serde::{Deserialize, Deserializer};

/// Strips every character outside `[0-9.]`.
pub fn sanitize_decimal_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Sanitizes and parses a price.
///
/// Returns `None` when nothing numeric is left or the remaining text is not
/// a single decimal number (e.g. `"1.2.3"`).
pub fn parse_decimal_input(input: &str) -> Option<f64> {
    let cleaned = sanitize_decimal_input(input);
    if cleaned.is_empty() || cleaned == "." {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient deserializer for optional prices.
///
/// Accepts JSON numbers, numeric strings (sanitized first) and `null`.
/// Anything else decodes as `None`.
pub fn deserialize_lenient_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| *v >= 0.0),
        Some(serde_json::Value::String(s)) => parse_decimal_input(&s),
        _ => None,
    })
}
