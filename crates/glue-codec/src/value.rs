//! Host-side dynamic value.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{CodecError, CodecResult};

/// Ordered map of names to values; iteration order is insertion order.
pub type HostMap = IndexMap<String, HostValue>;

/// Dynamic value exchanged with the library.
///
/// `List` covers both homogeneous and mixed lists; the encoder picks the
/// wire kind from the elements. `Records` is the explicit list-of-maps
/// form and is the only way to produce a composite array on the wire: a
/// `List` whose elements happen to be maps still encodes as a tuple.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<HostValue>),
    Map(HostMap),
    Records(Vec<HostMap>),
}

impl HostValue {
    /// Falsy values collapse to `{none, -1}` when encoded: null, `false`,
    /// zero, empty text and empty collections. NaN is truthy.
    pub fn is_falsy(&self) -> bool {
        match self {
            HostValue::Null => true,
            HostValue::Bool(b) => !*b,
            HostValue::Int(i) => *i == 0,
            HostValue::Float(f) => *f == 0.0,
            HostValue::Text(s) => s.is_empty(),
            HostValue::List(items) => items.is_empty(),
            HostValue::Map(map) => map.is_empty(),
            HostValue::Records(records) => records.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Text(_) => "text",
            HostValue::List(_) => "list",
            HostValue::Map(_) => "map",
            HostValue::Records(_) => "records",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            HostValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HostMap> {
        match self {
            HostValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on a map value.
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self.clone()))
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value.into())
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Text(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Text(value)
    }
}

impl From<HostMap> for HostValue {
    fn from(value: HostMap) -> Self {
        HostValue::Map(value)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

impl From<HostValue> for serde_json::Value {
    fn from(value: HostValue) -> Self {
        use serde_json::Value;
        match value {
            HostValue::Null => Value::Null,
            HostValue::Bool(b) => Value::Bool(b),
            HostValue::Int(i) => Value::from(i),
            // non-finite floats have no JSON form
            HostValue::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
            HostValue::Text(s) => Value::String(s),
            HostValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            HostValue::Map(map) => Value::Object(map_to_json(map)),
            HostValue::Records(records) => Value::Array(
                records
                    .into_iter()
                    .map(|map| Value::Object(map_to_json(map)))
                    .collect(),
            ),
        }
    }
}

fn map_to_json(map: HostMap) -> serde_json::Map<String, serde_json::Value> {
    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

impl TryFrom<&serde_json::Value> for HostValue {
    type Error = CodecError;

    /// JSON arrays become `List`s, including arrays of objects.
    fn try_from(value: &serde_json::Value) -> CodecResult<Self> {
        use serde_json::Value;
        Ok(match value {
            Value::Null => HostValue::Null,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HostValue::Int(i)
                } else if n.is_f64() {
                    HostValue::Float(n.as_f64().unwrap_or_default())
                } else {
                    // u64 above i64::MAX
                    return Err(CodecError::unsupported(format!("integer {n} outside the 64-bit signed range")));
                }
            }
            Value::String(s) => HostValue::Text(s.clone()),
            Value::Array(items) => HostValue::List(
                items
                    .iter()
                    .map(HostValue::try_from)
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            Value::Object(fields) => HostValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| -> CodecResult<(String, HostValue)> {
                        Ok((k.clone(), HostValue::try_from(v)?))
                    })
                    .collect::<CodecResult<HostMap>>()?,
            ),
        })
    }
}
