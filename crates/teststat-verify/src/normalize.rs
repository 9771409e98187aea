//! Canonical form of response payloads.
//!
//! Every scalar becomes a string so expectations (which are always strings)
//! compare directly:
//!
//! | Input | Normalized |
//! |---|---|
//! | `"RIPE NCC"` | `"ripencc"` |
//! | `true` / `false` | `"true"` / `"false"` |
//! | `3333`, `1.5` | `"3333"`, `"1.5"` |
//! | `null` | `"none"` |
//!
//! Arrays are normalized element-wise; objects have both keys and values
//! normalized. Applying `normalize` twice yields the same value as once.

use serde_json::{Map, Value};

/// Lower-case `s` and drop every space character.
pub fn normalize_str(s: &str) -> String {
    s.to_lowercase().replace(' ', "")
}

/// Return the canonical form of `value`.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_str(s)),
        // Bools first, a bool must never take the number branch.
        Value::Bool(b) => Value::String(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Null => Value::String("none".to_string()),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, inner) in fields {
                out.insert(normalize_str(key), normalize(inner));
            }
            Value::Object(out)
        }
    }
}
