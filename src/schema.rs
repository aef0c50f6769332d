//! Wire-neutral value model shared by every message crossing the gateway.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Value};

/// A numeric value. `Big` keeps the exact decimal text of values that do not
/// fit an `i64` / `f64` without loss (varint, decimal).
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    Big(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenericValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Vec<u8>),
    List(Vec<GenericValue>),
    Map(BTreeMap<String, GenericValue>),
}

/// One result row: column name to value.
pub type Row = BTreeMap<String, GenericValue>;

impl GenericValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            GenericValue::Null => "null",
            GenericValue::Bool(_) => "bool",
            GenericValue::Number(_) => "number",
            GenericValue::String(_) => "string",
            GenericValue::Binary(_) => "binary",
            GenericValue::List(_) => "list",
            GenericValue::Map(_) => "map",
        }
    }

    pub fn int(i: i64) -> Self {
        GenericValue::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        GenericValue::Number(Number::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        GenericValue::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GenericValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Natural text rendering, used when a value must become a map key.
    pub fn to_key_string(&self) -> String {
        match self {
            GenericValue::Null => "null".to_string(),
            GenericValue::Bool(b) => b.to_string(),
            GenericValue::Number(Number::Int(i)) => i.to_string(),
            GenericValue::Number(Number::Float(f)) => f.to_string(),
            GenericValue::Number(Number::Big(s)) | GenericValue::String(s) => s.clone(),
            GenericValue::Binary(bytes) => B64.encode(bytes),
            other => Value::from(other.clone()).to_string(),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Number::Int(i) => serializer.serialize_i64(*i),
            Number::Float(f) => serializer.serialize_f64(*f),
            Number::Big(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for GenericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GenericValue::Null => serializer.serialize_unit(),
            GenericValue::Bool(b) => serializer.serialize_bool(*b),
            GenericValue::Number(n) => n.serialize(serializer),
            GenericValue::String(s) => serializer.serialize_str(s),
            GenericValue::Binary(bytes) => serializer.serialize_str(&B64.encode(bytes)),
            GenericValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            GenericValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<Value> for GenericValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => GenericValue::Null,
            Value::Bool(b) => GenericValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    GenericValue::int(i)
                } else if n.is_u64() {
                    GenericValue::Number(Number::Big(n.to_string()))
                } else {
                    GenericValue::float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => GenericValue::String(s),
            Value::Array(items) => {
                GenericValue::List(items.into_iter().map(GenericValue::from).collect())
            }
            Value::Object(entries) => GenericValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, GenericValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<GenericValue> for Value {
    fn from(v: GenericValue) -> Self {
        match v {
            GenericValue::Null => Value::Null,
            GenericValue::Bool(b) => Value::Bool(b),
            GenericValue::Number(Number::Int(i)) => Value::from(i),
            // non-finite floats become null, matching serde_json
            GenericValue::Number(Number::Float(f)) => Value::from(f),
            GenericValue::Number(Number::Big(s)) | GenericValue::String(s) => Value::String(s),
            GenericValue::Binary(bytes) => Value::String(B64.encode(bytes)),
            GenericValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            GenericValue::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// Outcome of one routed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Row objects, possibly interleaved with per-statement error entries
    Rows(Vec<GenericValue>),
    Ok,
    Error(String),
}

impl Reply {
    pub fn ok_body() -> Value {
        serde_json::json!({ "status": "ok" })
    }

    pub fn error_body(message: &str) -> Value {
        serde_json::json!({ "status": "error", "message": message })
    }

    pub fn error_entry(message: &str) -> GenericValue {
        let mut m = BTreeMap::new();
        m.insert("status".to_string(), GenericValue::string("error"));
        m.insert("message".to_string(), GenericValue::string(message));
        GenericValue::Map(m)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Reply::Rows(rows) => Value::Array(rows.into_iter().map(Value::from).collect()),
            Reply::Ok => Self::ok_body(),
            Reply::Error(msg) => Self::error_body(&msg),
        }
    }
}

/// True for `{"status": "error", ...}` bodies.
pub fn is_error_body(v: &Value) -> bool {
    v.get("status").and_then(|s| s.as_str()) == Some("error")
}
