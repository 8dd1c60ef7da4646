//! Lossy-safe conversion of JSON tool arguments into typed call arguments.
//!
//! Conversion never fails. When a value cannot be coerced to its declared
//! type it is forwarded unchanged as [`ArgValue::Json`] and the problem is
//! recorded as a [`ConversionIssue`]; sibling arguments still convert.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use zkmcp_metadata::introspect::collect_fields;
use zkmcp_metadata::type_mapper::{categorize, CollectionFlavor, PrimitiveKind, TypeCategory};
use zkmcp_metadata::{ResolvedSignature, TypeDescriptorProvider};

use crate::value::ArgValue;

/// Key of the positional argument array legacy callers send.
pub const LEGACY_ARGS_KEY: &str = "args";

/// Default nesting limit for object conversion.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A value that was forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionIssue {
    /// Dotted path of the value, e.g. `order.orderItems[1].quantity`.
    pub path: String,
    /// Declared target type.
    pub target_type: String,
    /// What went wrong.
    pub reason: String,
}

/// Arguments ready for invocation, in call order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedArguments {
    /// Parameter types in call order.
    pub types: Vec<String>,
    /// Converted values in call order.
    pub values: Vec<ArgValue>,
    /// Values forwarded unchanged.
    pub issues: Vec<ConversionIssue>,
}

impl ConvertedArguments {
    /// Plain JSON values in call order.
    pub fn json_values(&self) -> Vec<Value> {
        self.values.iter().map(ArgValue::to_json).collect()
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn floating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn decimal_text(value: &Value, integer_only: bool) -> Option<String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    let digits = text.strip_prefix('-').unwrap_or(&text);
    let valid = if integer_only {
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    } else {
        text.parse::<f64>().is_ok()
            && text
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    };
    valid.then_some(text)
}

fn coerce_primitive(kind: PrimitiveKind, value: &Value) -> Option<ArgValue> {
    match kind {
        PrimitiveKind::Boolean => match value {
            Value::Bool(b) => Some(ArgValue::Bool(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(ArgValue::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                Some(ArgValue::Bool(false))
            }
            _ => None,
        },
        PrimitiveKind::Byte => integral(value)
            .and_then(|v| i8::try_from(v).ok())
            .map(ArgValue::Byte),
        PrimitiveKind::Short => integral(value)
            .and_then(|v| i16::try_from(v).ok())
            .map(ArgValue::Short),
        PrimitiveKind::Int => integral(value)
            .and_then(|v| i32::try_from(v).ok())
            .map(ArgValue::Int),
        PrimitiveKind::Long => integral(value).map(ArgValue::Long),
        PrimitiveKind::Float => floating(value)
            .filter(|f| f.abs() <= f64::from(f32::MAX))
            .map(|f| ArgValue::Float(f as f32)),
        PrimitiveKind::Double => floating(value).map(ArgValue::Double),
        PrimitiveKind::Char => match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(ArgValue::Char(c)),
                    _ => None,
                }
            }
            _ => None,
        },
        PrimitiveKind::String => match value {
            Value::String(s) => Some(ArgValue::Str(s.clone())),
            Value::Number(n) => Some(ArgValue::Str(n.to_string())),
            Value::Bool(b) => Some(ArgValue::Str(b.to_string())),
            _ => None,
        },
        PrimitiveKind::BigInteger => decimal_text(value, true).map(ArgValue::Big),
        PrimitiveKind::BigDecimal => decimal_text(value, false).map(ArgValue::Big),
        PrimitiveKind::DateTime | PrimitiveKind::Date => match value {
            Value::String(s) => Some(ArgValue::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(ArgValue::Long),
            _ => None,
        },
    }
}

fn dedupe(items: Vec<ArgValue>) -> Vec<ArgValue> {
    let mut seen_json = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        // ArgValue holds floats, so compare by canonical JSON text.
        if seen_json.insert(item.to_json().to_string()) {
            out.push(item);
        }
    }
    out
}

/// Converts JSON arguments into typed call arguments.
pub struct ParameterConverter {
    types: Option<Arc<dyn TypeDescriptorProvider>>,
    max_depth: usize,
}

impl ParameterConverter {
    /// Creates a converter. Without a type provider, objects are forwarded as JSON.
    pub fn new(types: Option<Arc<dyn TypeDescriptorProvider>>) -> Self {
        Self {
            types,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the object nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Converts a tool-call argument map against a signature.
    ///
    /// Values are taken by parameter name, falling back to the positional
    /// `args` array at the parameter's `order`. Missing values become null.
    /// Output order follows `order`, never map iteration order.
    pub fn convert(
        &self,
        arguments: &Map<String, Value>,
        sig: &ResolvedSignature,
    ) -> ConvertedArguments {
        let positional = arguments.get(LEGACY_ARGS_KEY).and_then(Value::as_array);
        if let Some(args) = positional {
            if sig.parameter(LEGACY_ARGS_KEY).is_none() && args.len() != sig.parameters.len() {
                warn!(
                    target: "zkmcp::convert",
                    key = %sig.key(),
                    expected = sig.parameters.len(),
                    actual = args.len(),
                    "positional argument count mismatch"
                );
            }
        }

        let mut params: Vec<_> = sig.parameters.iter().collect();
        params.sort_by_key(|p| p.order);

        let mut out = ConvertedArguments {
            types: Vec::with_capacity(params.len()),
            values: Vec::with_capacity(params.len()),
            issues: Vec::new(),
        };
        for param in params {
            let raw = arguments
                .get(&param.name)
                .or_else(|| positional.and_then(|args| args.get(param.order)))
                .unwrap_or(&Value::Null);
            let value = self.convert_at(raw, &param.type_name, &param.name, 0, &mut out.issues);
            out.types.push(param.type_name.clone());
            out.values.push(value);
        }
        out
    }

    /// Converts one value to a declared type.
    pub fn convert_value(&self, value: &Value, type_name: &str) -> ArgValue {
        let mut issues = Vec::new();
        self.convert_at(value, type_name, "$", 0, &mut issues)
    }

    fn pass_through(
        &self,
        value: &Value,
        type_name: &str,
        path: &str,
        reason: &str,
        issues: &mut Vec<ConversionIssue>,
    ) -> ArgValue {
        warn!(
            target: "zkmcp::convert",
            path,
            target_type = %type_name,
            reason,
            "argument forwarded unconverted"
        );
        issues.push(ConversionIssue {
            path: path.to_string(),
            target_type: type_name.to_string(),
            reason: reason.to_string(),
        });
        ArgValue::Json(value.clone())
    }

    fn convert_at(
        &self,
        value: &Value,
        type_name: &str,
        path: &str,
        depth: usize,
        issues: &mut Vec<ConversionIssue>,
    ) -> ArgValue {
        if value.is_null() {
            return ArgValue::Null;
        }
        match categorize(type_name) {
            TypeCategory::Primitive(kind) => match coerce_primitive(kind, value) {
                Some(v) => v,
                None => self.pass_through(value, type_name, path, "not coercible", issues),
            },
            TypeCategory::Collection { flavor, element } => {
                let Some(items) = value.as_array() else {
                    return self.pass_through(value, type_name, path, "expected an array", issues);
                };
                let converted = self.convert_items(items, &element, path, depth, issues);
                match flavor {
                    CollectionFlavor::List => ArgValue::List(converted),
                    CollectionFlavor::Set => ArgValue::Set(dedupe(converted)),
                }
            }
            TypeCategory::Array { element } => {
                let Some(items) = value.as_array() else {
                    return self.pass_through(value, type_name, path, "expected an array", issues);
                };
                ArgValue::Array {
                    items: self.convert_items(items, &element, path, depth, issues),
                    element_type: element,
                }
            }
            TypeCategory::Map { .. } => match value {
                Value::Object(map) => ArgValue::Map(map.clone()),
                _ => self.pass_through(value, type_name, path, "expected an object", issues),
            },
            TypeCategory::Any => ArgValue::Json(value.clone()),
            TypeCategory::Object(name) => self.convert_object(value, &name, path, depth, issues),
        }
    }

    fn convert_items(
        &self,
        items: &[Value],
        element: &str,
        path: &str,
        depth: usize,
        issues: &mut Vec<ConversionIssue>,
    ) -> Vec<ArgValue> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                self.convert_at(item, element, &format!("{path}[{idx}]"), depth + 1, issues)
            })
            .collect()
    }

    fn convert_object(
        &self,
        value: &Value,
        type_name: &str,
        path: &str,
        depth: usize,
        issues: &mut Vec<ConversionIssue>,
    ) -> ArgValue {
        let Value::Object(map) = value else {
            return self.pass_through(value, type_name, path, "expected an object", issues);
        };
        if depth >= self.max_depth {
            return self.pass_through(value, type_name, path, "nesting limit reached", issues);
        }
        let fields = self
            .types
            .as_ref()
            .and_then(|types| collect_fields(types.as_ref(), type_name));
        let Some(fields) = fields else {
            return self.pass_through(value, type_name, path, "unknown type", issues);
        };

        let mut converted = Vec::with_capacity(map.len());
        for field in &fields {
            if let Some(raw) = map.get(&field.name) {
                let field_path = format!("{path}.{}", field.name);
                let v = self.convert_at(raw, &field.type_name, &field_path, depth + 1, issues);
                converted.push((field.name.clone(), v));
            }
        }
        // Undeclared keys are forwarded so the provider can decide.
        for (key, raw) in map {
            if !fields.iter().any(|f| &f.name == key) {
                converted.push((key.clone(), ArgValue::Json(raw.clone())));
            }
        }
        ArgValue::Object {
            type_name: type_name.to_string(),
            fields: converted,
        }
    }
}
