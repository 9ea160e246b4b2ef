//! Typed scalar encoding for values carried inside `RECORD.PATCH` payloads.
//!
//! Each value is prefixed with a single type marker so the wire form is
//! self-describing and round-trips through [`encode`]/[`decode`] without
//! losing the original JSON scalar type (string vs. number vs. bool vs.
//! null vs. a nested object/array).

const STRING: char = 'S';
const OBJECT: char = 'O';
const NUMBER: char = 'N';
const NULL: char = 'L';
const TRUE: char = 'T';
const FALSE: char = 'F';

/// Encode a JSON value into its typed wire representation.
pub fn encode(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => NULL.to_string(),
        serde_json::Value::Bool(true) => TRUE.to_string(),
        serde_json::Value::Bool(false) => FALSE.to_string(),
        serde_json::Value::Number(n) => format!("{NUMBER}{n}"),
        serde_json::Value::String(s) => format!("{STRING}{s}"),
        other => format!("{OBJECT}{}", other),
    }
}

/// Decode a typed wire representation back into a JSON value.
///
/// An empty or unrecognized marker decodes to `Value::Null` rather than
/// erroring — matching the codec's "never throws to the caller" contract
/// for malformed payload fragments.
pub fn decode(raw: &str) -> serde_json::Value {
    let mut chars = raw.chars();
    let marker = match chars.next() {
        Some(c) => c,
        None => return serde_json::Value::Null,
    };
    let rest = chars.as_str();
    match marker {
        NULL => serde_json::Value::Null,
        TRUE => serde_json::Value::Bool(true),
        FALSE => serde_json::Value::Bool(false),
        NUMBER => rest
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        STRING => serde_json::Value::String(rest.to_owned()),
        OBJECT => serde_json::from_str(rest).unwrap_or(serde_json::Value::Null),
        _ => serde_json::Value::Null,
    }
}
