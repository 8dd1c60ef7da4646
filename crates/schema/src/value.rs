use serde::Serialize;
use serde_json::{json, Map, Number, Value};

/// A typed invocation argument.
///
/// `Json` carries a value forwarded unchanged, either because the target
/// accepts anything or because coercion was not possible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    /// Absent or explicit null.
    Null,
    /// `boolean`
    Bool(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `char`
    Char(char),
    /// Strings, dates, and times.
    Str(String),
    /// Arbitrary precision number kept as its decimal text.
    Big(String),
    /// Ordered collection.
    List(Vec<ArgValue>),
    /// Collection with duplicates removed, first occurrence order kept.
    Set(Vec<ArgValue>),
    /// Typed array.
    Array {
        /// Element type identifier.
        element_type: String,
        /// Elements.
        items: Vec<ArgValue>,
    },
    /// Map forwarded with its JSON values.
    Map(Map<String, Value>),
    /// Structured object with converted fields in declaration order.
    Object {
        /// Target type identifier.
        type_name: String,
        /// Field values.
        fields: Vec<(String, ArgValue)>,
    },
    /// Value forwarded unchanged.
    Json(Value),
}

impl ArgValue {
    /// Plain JSON form, as an RPC generic-invoke client would send it.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Null => Value::Null,
            ArgValue::Bool(b) => json!(b),
            ArgValue::Byte(v) => json!(v),
            ArgValue::Short(v) => json!(v),
            ArgValue::Int(v) => json!(v),
            ArgValue::Long(v) => json!(v),
            ArgValue::Float(v) => Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number),
            ArgValue::Double(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            ArgValue::Char(c) => Value::String(c.to_string()),
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::Big(text) => {
                serde_json::from_str::<Number>(text).map_or_else(|_| Value::String(text.clone()), Value::Number)
            }
            ArgValue::List(items) | ArgValue::Set(items) | ArgValue::Array { items, .. } => {
                Value::Array(items.iter().map(ArgValue::to_json).collect())
            }
            ArgValue::Map(map) => Value::Object(map.clone()),
            ArgValue::Object { fields, .. } => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            ArgValue::Json(v) => v.clone(),
        }
    }
}
