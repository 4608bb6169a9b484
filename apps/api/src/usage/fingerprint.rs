//! Request fingerprinting — SHA-256 over a canonical form of (operation, input).
//!
//! Canonical form:
//! - strings are trimmed and lowercased
//! - object keys are emitted in sorted order
//! - array order is kept
//! - numbers, booleans and null pass through
//!
//! Two requests that differ only in key order, case or surrounding whitespace
//! therefore share a fingerprint. The operation tag is part of the hashed
//! material, so the same input under two operations never collides.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::usage::operation::{OperationInput, OperationType};

/// Fingerprint of a validated operation input.
pub fn fingerprint_input(input: &OperationInput) -> String {
    fingerprint(input.operation_type(), &input.input_data())
}

/// Fingerprint of an operation over arbitrary JSON input. Lowercase hex, 64 chars.
pub fn fingerprint(operation: OperationType, input: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(&normalize(input), &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(operation.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Applies the string normalization recursively. Key ordering is handled at
/// serialization time.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Serializes `value` with object keys in lexicographic order, independent of
/// how the map stores them.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars: serde_json's own rendering escapes strings correctly.
        scalar => out.push_str(&scalar.to_string()),
    }
}
