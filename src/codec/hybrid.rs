//! Hybrid codec
//!
//! Some publishers emit a JSON object followed by trailing SOH-delimited
//! `key=value` metadata. The JSON object is isolated by scanning for its
//! matching closing brace (depth tracking that respects double-quoted strings
//! and backslash escapes); the SOH tail is merged into the object as
//! additional lower-cased keys with numeric promotion.

use super::CodecError;
use super::nvfix::SOH;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// True when the message is the hybrid shape: starts with `{` and carries at
/// least one SOH.
pub fn is_hybrid(raw: &str) -> bool {
    raw.trim_start().starts_with('{') && raw.contains(SOH)
}

/// Parse a hybrid message into a JSON object with the SOH metadata merged in.
pub fn parse_hybrid(raw: &str) -> Result<Value, CodecError> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with('{') {
        return Err(CodecError::parse(raw, "hybrid message must start with '{'"));
    }

    let json_end = find_json_end(trimmed)
        .ok_or_else(|| CodecError::parse(raw, "unterminated JSON object"))?;

    let mut value: Value = serde_json::from_str(&trimmed[..json_end])
        .map_err(|e| CodecError::parse(raw, e))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| CodecError::parse(raw, "hybrid head is not a JSON object"))?;

    for segment in trimmed[json_end..].split(SOH).filter(|s| !s.is_empty()) {
        let (key, val) = segment
            .split_once('=')
            .ok_or_else(|| CodecError::parse(raw, format!("metadata without '=': {segment}")))?;
        object.insert(key.to_ascii_lowercase(), promote(val));
    }

    Ok(value)
}

/// Parse a hybrid message and decode the merged object into `T`.
pub fn decode_hybrid<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    let merged = parse_hybrid(raw)?;
    serde_json::from_value(merged).map_err(|e| CodecError::parse(raw, e))
}

/// Index one past the closing brace of the leading JSON object.
fn find_json_end(raw: &str) -> Option<usize> {
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Numeric promotion for metadata values: pure digits become an integer,
/// digits-dot-digits a real, everything else stays a string.
fn promote(value: &str) -> Value {
    let bytes = value.as_bytes();
    if !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit) {
        if let Ok(n) = value.parse::<i64>() {
            return Value::from(n);
        }
    } else if let Some((int, frac)) = value.split_once('.')
        && !int.is_empty()
        && !frac.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
        && let Ok(f) = value.parse::<f64>()
    {
        return Value::from(f);
    }
    Value::from(value)
}

// ============================================================
// TESTS
// ============================================================
