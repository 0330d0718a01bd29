//! Runtime values for the dynamic object model.
//!
//! `Value` is the universe of things a dynamic member can hold: plain data,
//! nested objects, native functions, and deferred (not-yet-settled) results.
//! Equality is structural for data and pointer identity for objects,
//! functions, and deferred values.

use std::fmt;
use std::sync::Arc;

use crate::deferred::DeferredRef;
use crate::error::ObjectResult;
use crate::object::ObjectRef;

/// Signature of a native function attached to a dynamic object.
///
/// The first argument is the receiver (`None` when the function is invoked
/// detached from any object).
pub type NativeFn =
    dyn Fn(Option<&ObjectRef>, &[Value]) -> ObjectResult<Value> + Send + Sync;

/// A shared, callable native function.
#[derive(Clone)]
pub struct FuncRef(Arc<NativeFn>);

impl FuncRef {
    /// Wrap a native function.
    pub fn new(
        f: impl Fn(Option<&ObjectRef>, &[Value]) -> ObjectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    /// Invoke the function with the given receiver and arguments.
    pub fn call(&self, receiver: Option<&ObjectRef>, args: &[Value]) -> ObjectResult<Value> {
        (self.0)(receiver, args)
    }

    /// Check whether two references point at the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FuncRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[native fn @ {:p}]", Arc::as_ptr(&self.0))
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent / empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// String value.
    Str(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Reference to a dynamic object.
    Object(ObjectRef),
    /// Callable native function.
    Func(FuncRef),
    /// Deferred asynchronous value.
    Deferred(DeferredRef),
}

impl Value {
    /// Get the value's type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Func(_) => "function",
            Value::Deferred(_) => "deferred",
        }
    }

    /// Check whether the value is callable.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Func(_))
    }

    /// Check whether the value is a deferred asynchronous value.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Check whether the value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness, after the conventions of dynamic languages.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// View the value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// View the value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// View the value as an object reference, if it is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// View the value as a function, if it is one.
    pub fn as_func(&self) -> Option<&FuncRef> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    /// View the value as a deferred value, if it is one.
    pub fn as_deferred(&self) -> Option<&DeferredRef> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Render the value as JSON for sink output.
    ///
    /// Objects, functions, and deferred values render as opaque tags; data
    /// renders structurally.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => {
                serde_json::Value::String(format!("[object {}]", obj.class_name()))
            }
            Value::Func(_) => serde_json::Value::String("[function]".to_string()),
            Value::Deferred(d) => {
                let state = if d.is_settled() { "settled" } else { "pending" };
                serde_json::Value::String(format!("[deferred {state}]"))
            }
        }
    }

    /// Render the value for identity display.
    ///
    /// Strings render bare (no quoting), everything else via `Display`.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "[object {}]", obj.class_name()),
            Value::Func(_) => write!(f, "[function]"),
            Value::Deferred(_) => write!(f, "[deferred]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<FuncRef> for Value {
    fn from(f: FuncRef) -> Self {
        Value::Func(f)
    }
}

impl From<DeferredRef> for Value {
    fn from(d: DeferredRef) -> Self {
        Value::Deferred(d)
    }
}
