//! Dot-path access into JSON objects and the deep-merge used for partial
//! page updates.
//!
//! Merging is deliberately asymmetric: objects merge key by key, everything
//! else (arrays, scalars, null) replaces the target value outright. Grouped
//! page fields such as `meta` and `conversionTracking` depend on the
//! key-by-key behaviour so that a patch touching `meta.title` leaves
//! `meta.description` alone.

use serde_json::{Map, Value};

/// Assign `value` at the dot-separated `path` inside `root`.
///
/// Missing intermediate nodes are created as objects. Any non-object value
/// found along the way is overwritten by an empty object. The last
/// assignment to a path wins.
pub fn set_nested_value(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let slot = current.entry(segment.to_string()).or_insert(Value::Null);
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

/// Read the value at the dot-separated `path` inside `root`.
///
/// Returns `None` when any segment is missing or when an intermediate node
/// is not an object.
pub fn get_nested_value<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Merge `source` into `target` and return `target`.
///
/// When both sides hold an object under the same key the two objects are
/// merged recursively. In every other case the source value replaces the
/// target value.
pub fn deep_merge(
    target: &mut Map<String, Value>,
    source: Map<String, Value>,
) -> &mut Map<String, Value> {
    for (key, incoming) in source {
        match incoming {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    deep_merge(existing, incoming);
                    continue;
                }
                target.insert(key, Value::Object(incoming));
            }
            other => {
                target.insert(key, other);
            }
        }
    }
    target
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
