use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{Error, Result};
use crate::host::ExternalFunction;
use crate::runtime::{Environment, Primitive};

/// Runtime value representation
///
/// Values are immutable once built; lists and closures are shared through
/// `Rc`, so cloning a value never copies its contents.
#[derive(Clone)]
pub enum Value {
    /// Reference to a special form or builtin operator
    Atom(Primitive),
    /// Identifier, resolved through the environment when evaluated
    Symbol(Rc<str>),
    /// 64-bit floating-point number (the only numeric type)
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Ordered sequence of values; the empty list doubles as nil
    List(Rc<Vec<Value>>),
    /// Function value produced by evaluating `lambda`
    Closure(Rc<Closure>),
    /// Host-supplied callback, never serializable
    External(Rc<dyn ExternalFunction>),
}

/// A lambda together with the environment it was created in
pub struct Closure {
    /// Captured (defining) environment
    pub env: Environment,
    /// Parameter names, bound positionally on application
    pub params: Vec<String>,
    /// Body expression
    pub body: Value,
}

impl Value {
    /// Creates a symbol value
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Rc::from(name))
    }

    /// Creates a list value from a vector of values
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(values))
    }

    /// The empty list
    pub fn nil() -> Self {
        Value::List(Rc::new(Vec::new()))
    }

    /// Creates a closure value
    pub fn closure(env: Environment, params: Vec<String>, body: Value) -> Self {
        Value::Closure(Rc::new(Closure { env, params, body }))
    }

    /// Wraps a host callback as a value
    pub fn external<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Value::External(Rc::new(func))
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Atom(_) => "atom",
            Value::Symbol(_) => "symbol",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Closure(_) => "closure",
            Value::External(_) => "external-function",
        }
    }

    /// Only `#f` is false; every other value is true
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// True for the empty list
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    /// Returns the number, or a type error naming `op`
    pub fn as_number(&self, op: &str) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            _ => Err(Error::type_error(op, "number", self)),
        }
    }

    /// Returns the boolean, or a type error naming `op`
    pub fn as_bool(&self, op: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(Error::type_error(op, "bool", self)),
        }
    }

    /// Returns the list elements, or a type error naming `op`
    pub fn as_list(&self, op: &str) -> Result<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(Error::type_error(op, "list", self)),
        }
    }

    /// Returns the symbol name, if this is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Identity comparison used by `eq?`
    ///
    /// Heap values compare by pointer; numbers, booleans and atoms have no
    /// identity of their own and compare by value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::External(a), Value::External(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Atom(p) => write!(f, "{}", p),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, ")")
            }
            Value::Closure(c) => write!(f, "{}", c),
            Value::External(_) => write!(f, "<ExternalFunc>"),
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(lambda ({}) {})", self.params.join(" "), self.body)
    }
}

// Closures print their source form; the captured environment may be cyclic
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Atom(p) => write!(f, "Atom({})", p),
            Value::Symbol(s) => write!(f, "Symbol({})", s),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Closure(c) => write!(f, "Closure{}", c),
            Value::External(_) => write!(f, "External"),
        }
    }
}

/// Structural equality for tests and host code
///
/// Closures and external functions compare by identity. This is not the
/// language-level `equal?`, which has its own rules.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Closure(_), Value::Closure(_)) | (Value::External(_), Value::External(_)) => {
                self.ptr_eq(other)
            }
            _ => false,
        }
    }
}

/// JSON-friendly export for hosts: numbers and booleans map directly,
/// symbols and atoms become strings, lists become arrays, and functions
/// are exported as their textual form.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Symbol(s) => serializer.serialize_str(s),
            Value::Atom(p) => serializer.serialize_str(p.name()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Closure(_) | Value::External(_) => serializer.collect_str(self),
        }
    }
}
