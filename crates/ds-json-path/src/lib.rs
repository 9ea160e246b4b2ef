//! Read/write a nested value at a dotted/bracketed path string.
//!
//! Used by the Record Engine to resolve `RECORD.PATCH` paths and
//! path-scoped subscriptions against a record's JSON data.

mod parse;

use parse::Segment;
use serde_json::Value;

pub use parse::parse as parse_path;

/// Read the value at `path` within `root`.
///
/// Returns `None` ("undefined") if any intermediate segment is missing
/// or of the wrong shape (e.g. indexing into an object, or a key lookup
/// on an array).
pub fn get_value<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse::parse(path);
    let mut current = root;
    for segment in &segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(i), Value::Array(arr)) => arr.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path` within `root`, materializing any missing
/// intermediate objects/arrays along the way.
///
/// A numeric segment materializes an array (padded with `Value::Null` up
/// to the target index if necessary); a non-numeric segment materializes
/// an object. If an existing intermediate value has the wrong shape for
/// the next segment, it is overwritten.
pub fn set_value(root: &mut Value, path: &str, value: Value) {
    let segments = parse::parse(path);
    if segments.is_empty() {
        *root = value;
        return;
    }
    set_segments(root, &segments, value);
}

fn set_segments(current: &mut Value, segments: &[Segment], value: Value) {
    let (head, rest) = segments.split_first().expect("non-empty segments");

    match head {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(serde_json::Map::new());
            }
            let map = current.as_object_mut().expect("just coerced to object");
            if rest.is_empty() {
                map.insert(key.clone(), value);
            } else {
                let entry = map
                    .entry(key.clone())
                    .or_insert_with(|| placeholder_for(&rest[0]));
                set_segments(entry, rest, value);
            }
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let arr = current.as_array_mut().expect("just coerced to array");
            while arr.len() <= *index {
                arr.push(Value::Null);
            }
            if rest.is_empty() {
                arr[*index] = value;
            } else {
                if !matches_shape(&arr[*index], &rest[0]) {
                    arr[*index] = placeholder_for(&rest[0]);
                }
                set_segments(&mut arr[*index], rest, value);
            }
        }
    }
}

fn placeholder_for(segment: &Segment) -> Value {
    match segment {
        Segment::Key(_) => Value::Object(serde_json::Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

fn matches_shape(value: &Value, segment: &Segment) -> bool {
    match segment {
        Segment::Key(_) => value.is_object(),
        Segment::Index(_) => value.is_array(),
    }
}
