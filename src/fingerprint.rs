//! Content fingerprinting for change detection.
//!
//! Documents are re-crawled over time; the fingerprint of the extracted
//! fields is the sole signal for whether anything changed since the last
//! stored version. Keys are sorted before serialization so the insertion
//! order of the source mapping never affects the digest.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Compute the content fingerprint of an extracted field mapping.
///
/// The mapping is serialized as canonical JSON (object keys sorted
/// lexicographically at every nesting level, UTF-8) and hashed with
/// SHA-256. Identical field values always produce identical digests.
pub fn fingerprint(fields: &Map<String, Value>) -> String {
    let canonical = canonicalize(&Value::Object(fields.clone()));
    let serialized = canonical.to_string();

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Rebuild a JSON value with object keys in sorted order.
///
/// Rebuilt maps are populated in sorted order, so serialization emits
/// sorted keys regardless of the backing map implementation.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
