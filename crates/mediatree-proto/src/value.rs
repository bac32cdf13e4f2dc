//! Typed values: the tagged union every message argument and metadata field
//! is made of.
//!
//! On the wire a value is `{"t": <tag>, "v": <raw>}`.  The tag alone decides
//! how `v` is read, so an `int` and a `long` with the same number are distinct
//! values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Discriminant of a [`Value`], used when a value is built from a raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    String,
    Dictionary,
    Array,
    AudioFormat,
    VideoFormat,
    ColorRgb,
    ColorRgba,
    Position,
}

impl ValueKind {
    /// Wire tag (`"t"` field).
    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::Int => "i",
            ValueKind::Long => "l",
            ValueKind::Float => "f",
            ValueKind::String => "s",
            ValueKind::Dictionary => "d",
            ValueKind::Array => "a",
            ValueKind::AudioFormat => "af",
            ValueKind::VideoFormat => "vf",
            ValueKind::ColorRgb => "rgb",
            ValueKind::ColorRgba => "rgba",
            ValueKind::Position => "pos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    #[serde(rename = "i")]
    Int(i32),
    #[serde(rename = "l")]
    Long(i64),
    #[serde(rename = "f")]
    Float(f64),
    #[serde(rename = "s")]
    String(String),
    #[serde(rename = "d")]
    Dictionary(Dict),
    #[serde(rename = "a")]
    Array(Vec<Value>),
    #[serde(rename = "af")]
    AudioFormat(Dict),
    #[serde(rename = "vf")]
    VideoFormat(Dict),
    #[serde(rename = "rgb")]
    ColorRgb([f64; 3]),
    #[serde(rename = "rgba")]
    ColorRgba([f64; 4]),
    #[serde(rename = "pos")]
    Position([f64; 2]),
}

impl Value {
    /// Build a value of `kind` from its raw JSON payload.
    pub fn make(kind: ValueKind, raw: serde_json::Value) -> Result<Self, ProtoError> {
        let tagged = serde_json::json!({ "t": kind.tag(), "v": raw });
        serde_json::from_value(tagged).map_err(|e| ProtoError::InvalidValue {
            kind: kind.tag(),
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Dictionary(_) => ValueKind::Dictionary,
            Value::Array(_) => ValueKind::Array,
            Value::AudioFormat(_) => ValueKind::AudioFormat,
            Value::VideoFormat(_) => ValueKind::VideoFormat,
            Value::ColorRgb(_) => ValueKind::ColorRgb,
            Value::ColorRgba(_) => ValueKind::ColorRgba,
            Value::Position(_) => ValueKind::Position,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view.  Floats are truncated and numeric strings are parsed,
    /// matching how the server treats loosely typed metadata.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Float(v) => Some(v.trunc() as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Dictionaries carried by this value: the dictionary itself, or every
    /// dictionary element of an array.  Anything else yields nothing.
    pub fn dicts(&self) -> Vec<&Dict> {
        match self {
            Value::Dictionary(d) => vec![d],
            Value::Array(a) => a.iter().filter_map(Value::as_dict).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Array(a) => {
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            Value::ColorRgb(c) => write!(f, "{}, {}, {}", c[0], c[1], c[2]),
            Value::ColorRgba(c) => write!(f, "{}, {}, {}, {}", c[0], c[1], c[2], c[3]),
            Value::Position(p) => write!(f, "{}, {}", p[0], p[1]),
            Value::Dictionary(_) | Value::AudioFormat(_) | Value::VideoFormat(_) => {
                f.write_str("{...}")
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Dict> for Value {
    fn from(v: Dict) -> Self {
        Value::Dictionary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

/// String-keyed dictionary of values.  Key order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dict(BTreeMap<String, Value>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Display form of any scalar field (ints and arrays included).
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dict> {
        self.get(key).and_then(Value::as_dict)
    }

    pub fn get_dict_mut(&mut self, key: &str) -> Option<&mut Dict> {
        self.get_mut(key).and_then(Value::as_dict_mut)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    /// Recursive merge of `src` into `self`: dictionary fields are merged key
    /// by key, everything else is overwritten.
    pub fn merge(&mut self, src: &Dict) {
        for (key, value) in src.iter() {
            match (value, self.0.get_mut(key)) {
                (Value::Dictionary(s), Some(Value::Dictionary(d))) => d.merge(s),
                _ => {
                    self.0.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Dict(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_uses_short_tags() {
        let json = serde_json::to_string(&Value::Int(3)).unwrap();
        assert_eq!(json, r#"{"t":"i","v":3}"#);

        let v: Value = serde_json::from_str(r#"{"t":"rgb","v":[1.0,0.5,0.0]}"#).unwrap();
        assert_eq!(v, Value::ColorRgb([1.0, 0.5, 0.0]));
    }

    #[test]
    fn test_make_value_checks_kind() {
        let v = Value::make(ValueKind::Long, serde_json::json!(42)).unwrap();
        assert_eq!(v, Value::Long(42));
        assert_eq!(v.kind(), ValueKind::Long);

        assert!(Value::make(ValueKind::Int, serde_json::json!("nope")).is_err());
    }

    #[test]
    fn test_nested_dictionary_round_trip() {
        let mut inner = Dict::new();
        inner.set("Label", "Albums");
        let mut outer = Dict::new();
        outer.set("metadata", inner);
        outer.set("list", vec![Value::Int(1), Value::from("x")]);

        let json = serde_json::to_string(&Value::Dictionary(outer.clone())).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Dictionary(outer));
    }

    #[test]
    fn test_loose_integer_access() {
        let mut d = Dict::new();
        d.set("a", Value::Float(3.9));
        d.set("b", "17");
        d.set("c", Value::Long(1 << 40));
        assert_eq!(d.get_int("a"), Some(3));
        assert_eq!(d.get_int("b"), Some(17));
        assert_eq!(d.get_int("c"), Some(1 << 40));
        assert_eq!(d.get_int("missing"), None);
    }

    #[test]
    fn test_merge_is_recursive_for_dictionaries_only() {
        let mut dst = Dict::new();
        let mut m = Dict::new();
        m.set("Title", "Old");
        m.set("Year", 1999);
        dst.set("metadata", m);
        dst.set("tags", vec![Value::from("a"), Value::from("b")]);

        let mut src = Dict::new();
        let mut m2 = Dict::new();
        m2.set("Title", "New");
        src.set("metadata", m2);
        src.set("tags", vec![Value::from("c")]);

        dst.merge(&src);
        let m = dst.get_dict("metadata").unwrap();
        assert_eq!(m.get_str("Title"), Some("New"));
        assert_eq!(m.get_int("Year"), Some(1999));
        assert_eq!(dst.get_array("tags").unwrap().len(), 1);
    }

    #[test]
    fn test_display_joins_arrays() {
        let v = Value::Array(vec![Value::from("Rock"), Value::from("Pop")]);
        assert_eq!(v.to_string(), "Rock, Pop");
    }
}
