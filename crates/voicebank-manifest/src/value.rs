//! The manifest tree.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A JSON-shaped value with insertion-ordered mappings.
///
/// Mapping keys are plain strings and are never rewritten; only leaf
/// string values are visited by [`ManifestValue::map_strings`].
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<ManifestValue>),
    Mapping(Vec<(String, ManifestValue)>),
}

impl ManifestValue {
    /// Builds a mapping from `(key, value)` pairs, keeping their order.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ManifestValue)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Looks up `key` in a mapping. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&ManifestValue> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Rebuilds the tree with every string leaf passed through `f`.
    ///
    /// Returns the new tree and whether any string changed. Sequences and
    /// mappings report a change if any child did.
    pub fn map_strings<F>(&self, f: &mut F) -> (ManifestValue, bool)
    where
        F: FnMut(&str) -> String,
    {
        match self {
            Self::String(s) => {
                let rewritten = f(s);
                let changed = rewritten != *s;
                (Self::String(rewritten), changed)
            }
            Self::Sequence(items) => {
                let mut changed = false;
                let items = items
                    .iter()
                    .map(|item| {
                        let (item, item_changed) = item.map_strings(f);
                        changed |= item_changed;
                        item
                    })
                    .collect();
                (Self::Sequence(items), changed)
            }
            Self::Mapping(entries) => {
                let mut changed = false;
                let entries = entries
                    .iter()
                    .map(|(key, child)| {
                        let (child, child_changed) = child.map_strings(f);
                        changed |= child_changed;
                        (key.clone(), child)
                    })
                    .collect();
                (Self::Mapping(entries), changed)
            }
            Self::Null | Self::Bool(_) | Self::Number(_) => (self.clone(), false),
        }
    }
}

impl From<&str> for ManifestValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ManifestValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ManifestValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for ManifestValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ManifestValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<ManifestValue>> From<Option<T>> for ManifestValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for ManifestValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<ManifestValue> for serde_json::Value {
    fn from(value: ManifestValue) -> Self {
        match value {
            ManifestValue::Null => Self::Null,
            ManifestValue::Bool(b) => Self::Bool(b),
            ManifestValue::Number(n) => Self::Number(n),
            ManifestValue::String(s) => Self::String(s),
            ManifestValue::Sequence(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            ManifestValue::Mapping(entries) => {
                Self::Object(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl Serialize for ManifestValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ManifestValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}
