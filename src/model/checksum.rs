// src/model/checksum.rs

//! Content checksums for entities.
//!
//! Values are first converted to `serde_json::Value` and then fed into a
//! blake3 hasher in a canonical order: map keys sorted, each key followed by
//! its value, list items in order. Every node is tagged with its kind so that
//! e.g. the string `"1"` and the number `1` hash differently.

use blake3::Hasher;
use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;

/// Compute a hex checksum of any serializable value.
pub fn checksum_of<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(checksum_value(&value))
}

/// Compute a hex checksum of an already converted JSON value.
pub fn checksum_value(value: &Value) -> String {
    let mut hasher = Hasher::new();
    update_canonical(&mut hasher, value);
    hasher.finalize().to_hex().to_string()
}

fn update_canonical(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(b) => {
            hasher.update(if *b { b"t" } else { b"f" });
        }
        Value::Number(n) => {
            hasher.update(b"i");
            update_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.update(b"s");
            update_str(hasher, s);
        }
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                update_canonical(hasher, item);
            }
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            hasher.update(b"{");
            hasher.update(&(keys.len() as u64).to_le_bytes());
            for key in keys {
                update_str(hasher, key);
                update_canonical(hasher, &map[key.as_str()]);
            }
        }
    }
}

// Length prefix keeps adjacent strings from running into each other.
fn update_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Order-independent checksum over a collection of values: each item is
/// hashed on its own and the item digests are sorted before combining.
pub fn checksum_unordered<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut digests: Vec<String> = items.into_iter().map(checksum_value).collect();
    digests.sort();
    let mut hasher = Hasher::new();
    for d in digests {
        hasher.update(d.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
