//! Strip noisy fields from application payloads before reporting them

use serde_json::Value;

/// Geometry caches and internals the application includes on every shape
const NOISY_FIELDS: &[&str] = &[
    "transform",
    "transformInverse",
    "selrect",
    "points",
    "shapeRef",
    "touched",
    "modifiedAt",
];

/// Remove noisy keys, `_`-prefixed keys and nulls, recursively
pub fn clean(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, value)| {
                    !value.is_null() && !key.starts_with('_') && !NOISY_FIELDS.contains(&key.as_str())
                })
                .map(|(key, value)| (key, clean(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(clean).collect()),
        other => other,
    }
}
