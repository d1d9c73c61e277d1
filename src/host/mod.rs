//! Host binding surface
//!
//! An embedding program exposes its own operations to scripts as external
//! functions. Each receives the already-evaluated arguments and returns a
//! value or an evaluation error; what it does on the host side is opaque to
//! the interpreter.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::{Environment, Value};

/// A host callback callable from script code
pub trait ExternalFunction {
    /// Invoke the function with evaluated arguments
    fn call(&self, args: &[Value]) -> Result<Value>;
}

impl<F> ExternalFunction for F
where
    F: Fn(&[Value]) -> Result<Value>,
{
    fn call(&self, args: &[Value]) -> Result<Value> {
        self(args)
    }
}

/// Named collection of host functions, installable into any environment
///
/// A host typically builds one registry per subsystem (for example a
/// `"vessel."` prefix for vehicle accessors) and installs it into the root
/// environment before evaluating scripts.
#[derive(Default)]
pub struct HostRegistry {
    functions: BTreeMap<String, Rc<dyn ExternalFunction>>,
}

impl HostRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        HostRegistry {
            functions: BTreeMap::new(),
        }
    }

    /// Register a function under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.functions.insert(name.into(), Rc::new(func));
        self
    }

    /// Register every function of `other` under `prefix` + its name
    pub fn register_prefixed(&mut self, prefix: &str, other: HostRegistry) -> &mut Self {
        for (name, func) in other.functions {
            self.functions.insert(format!("{}{}", prefix, name), func);
        }
        self
    }

    /// Bind every registered function into `env`
    ///
    /// The same function object is shared by every environment it is
    /// installed into.
    pub fn install(&self, env: &Environment) {
        for (name, func) in &self.functions {
            env.define(name.clone(), Value::External(Rc::clone(func)));
        }
        tracing::debug!(count = self.functions.len(), "installed host functions");
    }

    /// Call a registered function directly
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self.functions.get(name).ok_or_else(|| Error::UnknownSymbol {
            name: name.to_string(),
        })?;
        func.call(args)
    }

    /// Check if a function is registered
    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// List all function names, sorted
    pub fn list(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    /// Number of registered functions
    pub fn count(&self) -> usize {
        self.functions.len()
    }
}

/// Argument unwrapping for host functions
///
/// Every failure is an evaluation error prefixed with the function name,
/// e.g. `throttle: expected a numeric argument`.
pub struct HostArgs<'a> {
    name: &'a str,
    args: &'a [Value],
}

impl<'a> HostArgs<'a> {
    /// Wrap the argument slice passed to the function `name`
    pub fn new(name: &'a str, args: &'a [Value]) -> Self {
        HostArgs { name, args }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// True when called with no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Fail unless exactly `n` arguments were passed
    pub fn expect_count(&self, n: usize) -> Result<()> {
        if self.args.len() != n {
            return Err(self.fail(format!(
                "expected {} argument{}, got {}",
                n,
                if n == 1 { "" } else { "s" },
                self.args.len()
            )));
        }
        Ok(())
    }

    /// Fail if more than `n` arguments were passed
    pub fn expect_at_most(&self, n: usize) -> Result<()> {
        if self.args.len() > n {
            return Err(self.fail(format!(
                "expected at most {} arguments, got {}",
                n,
                self.args.len()
            )));
        }
        Ok(())
    }

    /// Number at `index`
    pub fn number(&self, index: usize) -> Result<f64> {
        match self.at(index)? {
            Value::Number(n) => Ok(*n),
            _ => Err(self.fail("expected a numeric argument")),
        }
    }

    /// Boolean at `index`
    pub fn boolean(&self, index: usize) -> Result<bool> {
        match self.at(index)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.fail("expected a boolean argument")),
        }
    }

    /// List elements at `index`
    pub fn list(&self, index: usize) -> Result<&'a [Value]> {
        match self.at(index)? {
            Value::List(items) => Ok(items.as_slice()),
            _ => Err(self.fail("expected a list argument")),
        }
    }

    /// Three-element numeric list at `index`, e.g. a position vector
    pub fn vector3(&self, index: usize) -> Result<[f64; 3]> {
        let items = self.list(index)?;
        if items.len() != 3 {
            return Err(self.fail("expected a 3-element list"));
        }
        let mut out = [0.0; 3];
        for (slot, item) in out.iter_mut().zip(items) {
            match item {
                Value::Number(n) => *slot = *n,
                _ => return Err(self.fail("expected a 3-element numeric list")),
            }
        }
        Ok(out)
    }

    fn at(&self, index: usize) -> Result<&'a Value> {
        self.args.get(index).ok_or_else(|| {
            self.fail(format!("expected at least {} arguments", index + 1))
        })
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::InvalidArguments {
            op: format!("{}:", self.name),
            reason: reason.into(),
        }
    }
}

/// Build the list value for a three-component vector
pub fn vector3_value(v: [f64; 3]) -> Value {
    Value::list(v.iter().map(|n| Value::Number(*n)).collect())
}
