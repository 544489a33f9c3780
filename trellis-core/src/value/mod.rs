//! Dynamic Value Model
//!
//! The engine observes arbitrary nested object/array graphs. Since the shape
//! of that data is only known at runtime, it is modeled as a dynamic [`Value`]
//! enum rather than static Rust types.
//!
//! # Reference Semantics
//!
//! Containers ([`MapRef`], [`ListRef`]) are cheap handles over shared state:
//! cloning a `Value` clones the handle, not the data. Two handles to the same
//! container compare equal by identity, which is exactly the comparison the
//! write path's change-detection needs.
//!
//! # Equality
//!
//! [`Value::same_as`] is the write-path equality rule: primitives compare by
//! value (with `Int`/`Float` cross-comparison), `NaN` counts as equal to
//! itself, and containers compare by identity. The `PartialEq` impl is the
//! same relation except that `NaN != NaN`, per IEEE semantics.

mod list;
mod map;

pub use list::ListRef;
pub use map::{FieldGetter, FieldSetter, MapRef};

use std::fmt;
use std::rc::Rc;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A dynamically typed value in an observed data graph.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Map(MapRef),
    List(ListRef),
}

impl Value {
    /// Build a keyed container value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(MapRef::from_entries(entries))
    }

    /// Build an ordered container value from its items.
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(ListRef::new(items.into_iter().collect()))
    }

    /// Whether this value is a container (map or list).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::List(_))
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    /// Write-path equality: primitive value equality with `Int`/`Float`
    /// cross-comparison, `NaN` equal to itself, containers by identity.
    ///
    /// Assigning a value that is `same_as` the current one is a no-op: no
    /// notification is dispatched.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Convert to a `serde_json::Value`.
    ///
    /// The conversion reads containers through the reactive read path, so
    /// calling it inside a tracking scope registers dependencies on every
    /// field it visits.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            // IEEE floats: NaN != NaN.
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            _ => self.same_as(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Map(m) => m.fmt(f),
            Value::List(l) => l.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Value {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from))
            }
            serde_json::Value::Object(entries) => {
                Value::map(entries.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Map(m) => {
                let keys = m.keys();
                let mut state = serializer.serialize_map(Some(keys.len()))?;
                for key in keys {
                    // Reads through the tracked path.
                    state.serialize_entry(&key, &m.get(&key))?;
                }
                state.end()
            }
            Value::List(l) => {
                let len = l.len();
                let mut state = serializer.serialize_seq(Some(len))?;
                for i in 0..len {
                    state.serialize_element(&l.get(i))?;
                }
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}

/// A key into a container for the structural mutation entry points.
///
/// Ordered containers take indices; keyed containers take names. An all-digit
/// name doubles as a valid index, matching how dynamic data usually addresses
/// list elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    /// Interpret the key as a sequence index, if possible.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().ok()
            }
            Key::Name(_) => None,
        }
    }

    /// The key as a map field name.
    pub fn name(&self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(s) => s.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(s) => write!(f, "{s}"),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Key {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Key {
        Key::Name(s)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
