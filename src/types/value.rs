use std::fmt;
use std::rc::Rc;

use crate::resolve::{Closure, ModuleId};

/// A statically resolved value.
///
/// Objects keep their keys in first-insertion order; assigning an existing key
/// replaces the value in place, matching how object literals and spreads
/// behave at runtime.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
    /// A constant-foldable function together with the scope it closes over.
    Function(Rc<Closure>),
    /// The `css` export of an import source: returns its argument unchanged.
    StyleFn,
    /// `import * as ns`; members resolve lazily through the module graph.
    Namespace(ModuleId),
}

impl Value {
    /// Name of the value's type as reported by `typeof`, except arrays and
    /// namespaces which report their own kind for clearer diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Num(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Function(_) | Value::StyleFn => "function",
            Value::Namespace(_) => "namespace",
        }
    }

    /// The result of `typeof`.
    #[must_use]
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null | Value::Array(_) | Value::Namespace(_) => "object",
            other => other.type_name(),
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
            _ => true,
        }
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// String conversion as performed by template literals and `+`.
    /// Returns `None` for values whose string form is not meaningful CSS
    /// (objects, functions).
    #[must_use]
    pub fn to_js_string(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Num(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null => Some("null".to_owned()),
            Value::Undefined => Some("undefined".to_owned()),
            Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()?
                    });
                }
                Some(parts.join(","))
            }
            Value::Object(_) | Value::Function(_) | Value::StyleFn | Value::Namespace(_) => None,
        }
    }

    /// Property lookup for `value.key` / `value[key]`. Namespaces are not
    /// handled here since their members live in the module graph.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(fields) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            Value::Array(items) => {
                if key == "length" {
                    #[allow(clippy::cast_precision_loss)]
                    return Some(Value::Num(items.len() as f64));
                }
                key.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
            }
            Value::Str(s) => {
                if key == "length" {
                    #[allow(clippy::cast_precision_loss)]
                    return Some(Value::Num(s.encode_utf16().count() as f64));
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Str(c.to_string()))
            }
            _ => None,
        }
    }
}

/// Insert `key` into an ordered object, replacing an existing entry in place.
pub fn object_insert(fields: &mut Vec<(String, Value)>, key: String, value: Value) {
    match fields.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => fields.push((key, value)),
    }
}

/// Formats a number the way string conversion does at runtime: integral
/// values print without a fractional part, and magnitudes of `1e21` and
/// above or below `1e-6` use exponent notation (`1e+21`, `1.5e-7`).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null)
            | (Value::Undefined, Value::Undefined)
            | (Value::StyleFn, Value::StyleFn) => true,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(v) => write!(f, "\"{v}\""),
            Value::Num(v) => f.write_str(&format_number(*v)),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Null => f.write_str("null"),
            Value::Undefined => f.write_str("undefined"),
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Function(_) | Value::StyleFn => f.write_str("[function]"),
            Value::Namespace(_) => f.write_str("[namespace]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(4.0), Value::Num(4.0));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("red"), Value::Str("red".to_owned()));
        assert_eq!(Value::from("red".to_owned()), Value::Str("red".to_owned()));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e30), "-2.5e+30");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-8), "1.5e-8");
        assert_eq!(format_number(123.0), "123");
    }

    #[test]
    fn truthiness() {
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Num(0.0).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Object(Vec::new()).is_truthy());
    }

    #[test]
    fn string_conversion() {
        assert_eq!(Value::Num(12.0).to_js_string().as_deref(), Some("12"));
        let arr = Value::Array(vec![Value::from("a"), Value::Null, Value::Num(1.0)]);
        assert_eq!(arr.to_js_string().as_deref(), Some("a,,1"));
        assert_eq!(Value::Object(Vec::new()).to_js_string(), None);
    }

    #[test]
    fn property_lookup() {
        let obj = Value::Object(vec![("color".into(), Value::from("red"))]);
        assert_eq!(obj.get("color"), Some(Value::from("red")));
        assert_eq!(obj.get("missing"), None);

        let arr = Value::Array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(arr.get("1"), Some(Value::from("b")));
        assert_eq!(arr.get("length"), Some(Value::Num(2.0)));
        assert_eq!(Value::from("abc").get("length"), Some(Value::Num(3.0)));
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut fields = Vec::new();
        object_insert(&mut fields, "a".into(), Value::Num(1.0));
        object_insert(&mut fields, "b".into(), Value::Num(2.0));
        object_insert(&mut fields, "a".into(), Value::Num(3.0));
        assert_eq!(
            fields,
            vec![("a".into(), Value::Num(3.0)), ("b".into(), Value::Num(2.0))]
        );
    }

    #[test]
    fn type_of_matches_runtime() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::Array(Vec::new()).type_of(), "object");
        assert_eq!(Value::StyleFn.type_of(), "function");
    }

    #[test]
    fn display() {
        let obj = Value::Object(vec![
            ("a".into(), Value::Num(1.0)),
            ("b".into(), Value::Array(vec![Value::from("x")])),
        ]);
        assert_eq!(obj.to_string(), "{a: 1, b: [\"x\"]}");
    }
}
