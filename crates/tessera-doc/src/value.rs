//! Document value model.
//!
//! A document is a tree of [`Value`]s. Ordering is significant everywhere:
//! arrays preserve element order, and [`Dict`] preserves key insertion order.
//! Structural equality (`==`) is therefore order-sensitive, which is exactly
//! the equality the persistence layer's round-trip guarantee is stated in.

use std::fmt;

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// An opaque byte payload with a short string discriminator naming its
/// semantic type (e.g. `"mat4"`, `"int64"`).
///
/// The codec moves the bytes verbatim; interpreting them is entirely the
/// producer's and consumer's business.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    /// Semantic type tag.
    pub tag: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

impl Blob {
    /// Create a blob from a tag and payload.
    pub fn new(tag: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            bytes,
        }
    }
}

impl fmt::Debug for Blob {
    // Payloads can be large; show the tag and length, not the bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({:?}, {} bytes)", self.tag, self.bytes.len())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single document value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// Tagged binary blob.
    Blob(Blob),
    /// Ordered, heterogeneous array.
    Array(Vec<Value>),
    /// Ordered dictionary.
    Dict(Dict),
}

impl Value {
    /// Short kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Blob(_) => "blob",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }

    /// Returns the integer payload, if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the blob payload, if this is a [`Value::Blob`].
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the element slice, if this is an [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(vs) => Some(vs),
            _ => None,
        }
    }

    /// Returns the dictionary, if this is a [`Value::Dict`].
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Lossy JSON projection for diagnostics and test output.
    ///
    /// Blob payloads are rendered as `{ "$blob": tag, "len": n }` stubs --
    /// this is for human eyes only and does not round-trip.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Blob(b) => serde_json::json!({
                "$blob": b.tag,
                "len": b.bytes.len(),
            }),
            Value::Array(vs) => {
                serde_json::Value::Array(vs.iter().map(Value::to_json).collect())
            }
            Value::Dict(d) => {
                let mut map = serde_json::Map::new();
                for (k, v) in d.iter() {
                    map.insert(k.to_owned(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dict
// ---------------------------------------------------------------------------

/// An ordered dictionary with unique string keys.
///
/// Keys keep their insertion order, and that order is significant: it is what
/// the wire format writes and what structural equality compares. Inserting an
/// existing key replaces the value in place, retaining the key's original
/// position.
///
/// Lookups are linear. Documents in this system are small (one entry per
/// component type, a handful of fields per component), so a side index would
/// cost more than it saves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value under `key`.
    ///
    /// Returns the previous value if the key was already present; the key
    /// keeps its original position in that case.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        for (k, v) in &mut self.entries {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up a value by key, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preserves_order() {
        let mut d = Dict::new();
        d.insert("b", Value::Int(1));
        d.insert("a", Value::Int(2));
        d.insert("c", Value::Int(3));
        let keys: Vec<&str> = d.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn insert_existing_key_replaces_in_place() {
        let mut d = Dict::new();
        d.insert("a", Value::Int(1));
        d.insert("b", Value::Int(2));
        let old = d.insert("a", Value::Int(10));
        assert_eq!(old, Some(Value::Int(1)));
        assert_eq!(d.get("a"), Some(&Value::Int(10)));
        // "a" keeps its original (first) position.
        let keys: Vec<&str> = d.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let mut d1 = Dict::new();
        d1.insert("a", Value::Int(1));
        d1.insert("b", Value::Int(2));

        let mut d2 = Dict::new();
        d2.insert("b", Value::Int(2));
        d2.insert("a", Value::Int(1));

        assert_ne!(d1, d2);
    }

    #[test]
    fn to_json_renders_blobs_as_stubs() {
        let v = Value::Blob(Blob::new("mat3", vec![0u8; 36]));
        assert_eq!(
            v.to_json(),
            serde_json::json!({ "$blob": "mat3", "len": 36 })
        );
    }
}
