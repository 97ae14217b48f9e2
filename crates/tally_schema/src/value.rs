//! Typed attribute tree used by resource and usage views.
//!
//! Terraform plans and usage files arrive as loosely typed JSON/YAML. They are
//! converted once into [`Value`], which never fails on lookup: a path that does
//! not resolve yields [`Value::Absent`] instead of an error.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Number;

static ABSENT: Value = Value::Absent;

/// A node in an attribute tree.
///
/// JSON `null` is folded into `Absent`: Terraform serializes unset optional
/// attributes as `null`, and handlers treat those exactly like missing keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Absent,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Look up a dotted path such as `root_block_device.0.volume_size`.
    ///
    /// Numeric segments index into sequences. An empty path returns `self`.
    pub fn get(&self, path: &str) -> &Value {
        if path.is_empty() {
            return self;
        }

        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Mapping(map) => map.get(segment).unwrap_or(&ABSENT),
                Value::Sequence(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index))
                    .unwrap_or(&ABSENT),
                _ => &ABSENT,
            };
        }
        current
    }

    /// Whether this value is present.
    pub fn exists(&self) -> bool {
        !matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render a scalar as a string. Absent values and containers render empty.
    pub fn string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Truthiness of a scalar: `true`, `"true"`, or a non-zero number.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Exact decimal view of a number or numeric string.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => number_to_decimal(n),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        }
    }

    /// Materialize this value as a list of elements.
    ///
    /// Sequences yield their elements, absent values yield nothing, and any
    /// other value is treated as a single-element list.
    pub fn array(&self) -> Vec<&Value> {
        match self {
            Value::Sequence(items) => items.iter().collect(),
            Value::Absent => Vec::new(),
            other => vec![other],
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Insert a key into a mapping value. Non-mapping values are left untouched.
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Mapping(map) = self {
            map.insert(key.into(), value);
        }
    }
}

fn number_to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    parse_decimal(&n.to_string())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
