//! Precision-preserving decimal text for claim sub-fields.
//!
//! Dump numbers routinely carry more significant digits than an `f64` holds,
//! so they are never routed through a float. With serde_json's
//! `arbitrary_precision` feature a JSON number keeps its source text.

use serde_json::{Number, Value};

/// Converts a numeric JSON value into canonical decimal text.
///
/// Implementations must not lose precision. `None` means the value is not a
/// decimal at all; callers decide whether that is an error.
pub trait DecimalFormatter: Send + Sync {
    /// Canonical text for `value`, or `None` if it is not a decimal.
    fn format_decimal(&self, value: &Value) -> Option<String>;
}

/// Default formatter: JSON numbers keep their exact source text, and decimal
/// strings such as `"+12.500"` pass through verbatim once validated.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalDecimal;

impl DecimalFormatter for CanonicalDecimal {
    fn format_decimal(&self, value: &Value) -> Option<String> {
        match value {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) if is_decimal_text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

/// True if `text` is a JSON number, optionally with a leading `+`.
pub fn is_decimal_text(text: &str) -> bool {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.starts_with(['+', '-']) && text.starts_with('+') {
        return false;
    }
    unsigned.parse::<Number>().is_ok()
}
