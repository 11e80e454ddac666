//! Canonical JSON rendering for audit digests.
//!
//! Object keys are sorted at every level, there is no whitespace, and floats
//! are fixed-precision decimal strings so that the last-ulp noise of libm
//! never reaches the digest. Integers stay plain JSON integers.

use serde::Serialize;
use serde_json::Value;

use crate::error::ComputationError;

/// Decimal places for floats.
pub const FLOAT_DECIMALS: usize = 6;

/// Decimal places for `lat` / `lon` fields (~1 cm).
pub const COORDINATE_DECIMALS: usize = 7;

/// Render `value` in canonical form.
///
/// # Errors
///
/// Returns [`ComputationError`] if `value` cannot be serialized.
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, ComputationError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ComputationError::new(format!("canonical serialization: {e}")))?;
    let mut out = String::new();
    write_value(&value, None, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, key: Option<&str>, out: &mut String) -> Result<(), ComputationError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                out.push_str(&n.to_string());
            } else {
                let x = n.as_f64().unwrap_or_default();
                let decimals = match key {
                    Some("lat" | "lon") => COORDINATE_DECIMALS,
                    _ => FLOAT_DECIMALS,
                };
                out.push('"');
                out.push_str(&format_float(x, decimals));
                out.push('"');
            }
        }
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Array elements inherit the key so coordinate lists stay
                // at coordinate precision.
                write_value(item, key, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(k, out)?;
                out.push(':');
                write_value(v, Some(k), out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) -> Result<(), ComputationError> {
    let quoted = serde_json::to_string(s)
        .map_err(|e| ComputationError::new(format!("canonical string: {e}")))?;
    out.push_str(&quoted);
    Ok(())
}

/// Fixed-precision rendering with negative zero folded into zero.
#[must_use]
pub fn format_float(x: f64, decimals: usize) -> String {
    let s = format!("{x:.decimals$}");
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}
