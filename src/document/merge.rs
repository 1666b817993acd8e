//! Deep merge of a base document with an overlay.

use serde_json::Value;

use crate::document::Document;

/// Merge `overlay` on top of `base`.
///
/// Two objects merge key by key, recursing on keys present in both. In every
/// other case (arrays, scalars, null, mismatched types) the overlay value
/// replaces the base value outright.
pub fn merge(base: Document, overlay: Document) -> Document {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}
