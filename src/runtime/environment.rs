use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::Value;

/// One frame of the lexical scope chain
///
/// An `Environment` is a handle: cloning it is an `Rc` increment and every
/// clone observes the same bindings. Closures keep their defining frame
/// alive through such a handle.
#[derive(Clone)]
pub struct Environment {
    state: Rc<RefCell<Frame>>,
}

/// Bindings of a single frame plus the link to its parent
#[derive(Default)]
struct Frame {
    /// Ordered so that snapshots are deterministic
    bindings: BTreeMap<String, Value>,
    /// Enclosing frame (None for a root)
    outer: Option<Environment>,
}

impl Environment {
    /// Creates a new root environment with no bindings
    pub fn new() -> Self {
        Environment {
            state: Rc::new(RefCell::new(Frame::default())),
        }
    }

    /// Creates an empty child frame of `outer`
    pub fn with_outer(outer: &Environment) -> Self {
        Environment {
            state: Rc::new(RefCell::new(Frame {
                bindings: BTreeMap::new(),
                outer: Some(outer.clone()),
            })),
        }
    }

    /// Creates a child frame binding `params` to `args` positionally
    pub fn extend(&self, params: &[String], args: Vec<Value>) -> Self {
        let bindings = params.iter().cloned().zip(args).collect();
        Environment {
            state: Rc::new(RefCell::new(Frame {
                bindings,
                outer: Some(self.clone()),
            })),
        }
    }

    /// Looks a name up in this frame, then outward
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let frame = current.state.borrow();
                if let Some(val) = frame.bindings.get(name) {
                    return Some(val.clone());
                }
                frame.outer.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return None,
            }
        }
    }

    /// Like [`lookup`](Self::lookup), failing with an unknown-symbol error
    pub fn get(&self, name: &str) -> Result<Value> {
        self.lookup(name).ok_or_else(|| Error::UnknownSymbol {
            name: name.to_string(),
        })
    }

    /// Binds `name` in this frame only, overwriting any existing binding
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.state.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Binds `name` in this frame only if it is not visible anywhere in the chain
    ///
    /// Returns true if the binding was added.
    pub fn initialize(&self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.contains(&name) {
            false
        } else {
            self.define(name, value);
            true
        }
    }

    /// Rebinds `name` in the nearest frame that already has it
    ///
    /// Returns false, creating nothing, when `name` is unbound everywhere.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let mut current = self.clone();
        loop {
            let next = {
                let mut frame = current.state.borrow_mut();
                if let Some(slot) = frame.bindings.get_mut(name) {
                    *slot = value;
                    return true;
                }
                frame.outer.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return false,
            }
        }
    }

    /// Checks whether `name` is bound anywhere in the chain
    pub fn contains(&self, name: &str) -> bool {
        let mut current = self.clone();
        loop {
            let next = {
                let frame = current.state.borrow();
                if frame.bindings.contains_key(name) {
                    return true;
                }
                frame.outer.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return false,
            }
        }
    }

    /// Binds a host callback under `name` in this frame
    pub fn register_external<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.define(name, Value::external(func));
    }

    /// The enclosing frame, if any
    pub fn outer(&self) -> Option<Environment> {
        self.state.borrow().outer.clone()
    }

    /// Copy of this frame's own bindings, in name order
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.state
            .borrow()
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of bindings in this frame (not counting outer frames)
    pub fn len(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    /// True if this frame has no bindings of its own
    pub fn is_empty(&self) -> bool {
        self.state.borrow().bindings.is_empty()
    }

    /// Number of frames from here to the root, inclusive
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.outer();
        while let Some(env) = current {
            depth += 1;
            current = env.outer();
        }
        depth
    }

    /// True if both handles refer to the same frame
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Identity key of the frame, stable while any handle is alive
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.state) as *const () as usize
    }

    /// Replaces this frame's bindings and parent wholesale
    pub(crate) fn replace(&self, bindings: Vec<(String, Value)>, outer: Option<Environment>) {
        let mut frame = self.state.borrow_mut();
        frame.bindings = bindings.into_iter().collect();
        frame.outer = outer;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Frames can reach themselves through closures, so only local names are shown
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let frame = self.state.borrow();
        f.debug_struct("Environment")
            .field("names", &frame.bindings.keys().collect::<Vec<_>>())
            .field("has_outer", &frame.outer.is_some())
            .finish()
    }
}
