//! The `Value` type (spec §3.1): a tagged variant over nil, number, string,
//! bool, array, object, and function, with array/object carrying reference
//! semantics.
//!
//! Grounded on `ouros::value::Value` for the overall hybrid-enum shape and
//! its "don't derive Clone carelessly" discipline, adapted here to a single
//! value type (no separate heap-arena indirection) since `parallel`
//! requires `Array`/`Object` to be `Send + Sync`-shareable across real OS
//! threads rather than arena-indexed from a single-threaded VM (see
//! DESIGN.md, "Arc over Rc").

use std::fmt;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::function::FunctionValue;

/// Shared, mutable, reference-semantic array storage.
pub type SharedArray = Arc<Mutex<Vec<Value>>>;
/// Shared, mutable, reference-semantic object storage. `IndexMap` keeps
/// insertion order, which makes `keys()`/`format_json` output stable and
/// matches the teacher's own preference for order-preserving maps
/// (`ouros`'s `serde_json` dependency is built with `preserve_order`).
pub type SharedObject = Arc<Mutex<IndexMap<String, Value>>>;

/// The dynamically-typed value every expression in the language evaluates
/// to.
#[derive(Clone)]
pub enum Value {
    Nil,
    Number(f64),
    Bool(bool),
    String(Arc<str>),
    Array(SharedArray),
    Object(SharedObject),
    Function(Arc<FunctionValue>),
}

impl Value {
    #[must_use]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Arc::new(Mutex::new(items)))
    }

    #[must_use]
    pub fn object(fields: IndexMap<String, Value>) -> Self {
        Self::Object(Arc::new(Mutex::new(fields)))
    }

    /// The type name as returned by the `type()` builtin (spec §4.4).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Truthiness rules from spec §3.1: nil, false, 0, "", empty array/object
    /// are falsy; everything else (including every function) is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.lock().unwrap().is_empty(),
            Self::Object(o) => !o.lock().unwrap().is_empty(),
            Self::Function(_) => true,
        }
    }

    /// Identity for arrays/objects/functions, value equality for scalars
    /// (spec §3.1). Mixed types are never equal.
    #[must_use]
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural equality used by the datastore (spec §4.8): scalars by
    /// value, arrays/objects by recursive element-wise comparison.
    #[must_use]
    pub fn structurally_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.lock().unwrap();
                let b = b.lock().unwrap();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structurally_equals(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.lock().unwrap();
                let b = b.lock().unwrap();
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| v.structurally_equals(bv)))
            }
            _ => self.equals(other),
        }
    }

    /// Recursive copy with arrays/objects duplicated and functions stripped
    /// (replaced with `Nil`) — used by `deep_copy()` (spec §4.4) and by
    /// every datastore method that must isolate callers from stored state
    /// (spec §4.7).
    #[must_use]
    pub fn deep_copy(&self) -> Value {
        match self {
            Self::Array(a) => {
                let items = a.lock().unwrap().iter().map(Value::deep_copy).collect();
                Value::array(items)
            }
            Self::Object(o) => {
                let fields = o.lock().unwrap().iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect();
                Value::object(fields)
            }
            Self::Function(_) => Value::Nil,
            other => other.clone(),
        }
    }
}

/// Numbers print as integers when exactly representable as such; otherwise
/// in shortest-round-trip decimal via `ryu` (spec §3.1).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
            Self::Array(a) => {
                f.write_str("[")?;
                let items = a.lock().unwrap();
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if matches!(v, Self::String(_)) {
                        write!(f, "{v:?}")?;
                    } else {
                        write!(f, "{v}")?;
                    }
                }
                f.write_str("]")
            }
            Self::Object(o) => {
                f.write_str("{")?;
                let fields = o.lock().unwrap();
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: ")?;
                    if matches!(v, Self::String(_)) {
                        write!(f, "{v:?}")?;
                    } else {
                        write!(f, "{v}")?;
                    }
                }
                f.write_str("}")
            }
            Self::Function(func) => write!(f, "<function {}>", func.display_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::array(vec![]).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::string("0").is_truthy());
    }

    #[test]
    fn arrays_are_reference_semantic() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = a.clone();
        if let Value::Array(arr) = &a {
            arr.lock().unwrap().push(Value::Number(2.0));
        }
        assert!(a.equals(&b));
        if let Value::Array(arr) = &b {
            assert_eq!(arr.lock().unwrap().len(), 2);
        }
    }

    #[test]
    fn deep_copy_strips_functions_and_is_independent() {
        let inner = Value::array(vec![Value::Number(1.0)]);
        let copy = inner.deep_copy();
        if let Value::Array(arr) = &inner {
            arr.lock().unwrap().push(Value::Number(2.0));
        }
        if let Value::Array(arr) = &copy {
            assert_eq!(arr.lock().unwrap().len(), 1);
        }
    }

    #[test]
    fn number_formatting_is_shortest_round_trip() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(-0.5), "-0.5");
    }
}
